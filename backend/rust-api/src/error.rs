use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the serving API. Every variant maps to a stable
/// machine-readable kind; internal failure details are logged, never
/// serialized into a response body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("no questions available in the system")]
    EmptyBank,

    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("this question has already been answered in the current session")]
    AlreadyAnswered,

    #[error("{0}")]
    MalformedQuestion(String),

    #[error("automatic classification failed")]
    ClassificationFailed,

    #[error("storage temporarily unavailable")]
    TransientStorage(#[source] anyhow::Error),

    #[error("operation timed out")]
    Timeout,
}

impl ApiError {
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        ApiError::TransientStorage(err.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::EmptyBank => "empty_bank",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::AlreadyAnswered => "already_answered",
            ApiError::MalformedQuestion(_) => "malformed_question",
            ApiError::ClassificationFailed => "classification_failed",
            ApiError::TransientStorage(_) => "storage_unavailable",
            ApiError::Timeout => "timeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::EmptyBank => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::AlreadyAnswered => StatusCode::CONFLICT,
            ApiError::MalformedQuestion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ClassificationFailed => StatusCode::BAD_GATEWAY,
            ApiError::TransientStorage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::TransientStorage(ref source) = self {
            tracing::error!(error = %source, "storage operation failed");
        } else if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {}", self);
        }

        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ApiError::EmptyBank.kind(), "empty_bank");
        assert_eq!(ApiError::AlreadyAnswered.kind(), "already_answered");
        assert_eq!(
            ApiError::Validation("bad shape".into()).kind(),
            "validation_error"
        );
        assert_eq!(
            ApiError::storage(anyhow::anyhow!("redis down")).kind(),
            "storage_unavailable"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::EmptyBank.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::AlreadyAnswered.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn storage_errors_do_not_leak_internals() {
        let err = ApiError::storage(anyhow::anyhow!("connection refused at 10.0.0.3:6379"));
        assert_eq!(err.to_string(), "storage temporarily unavailable");
    }
}
