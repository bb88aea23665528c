//! Response-format tests for the error taxonomy: kind strings and
//! status codes are part of the public contract.

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use quizdeck_api::error::ApiError;

async fn response_parts(err: ApiError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn empty_bank_maps_to_404_with_stable_kind() {
    let (status, body) = response_parts(ApiError::EmptyBank).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "empty_bank");
    assert_eq!(body["error"]["message"], "no questions available in the system");
}

#[tokio::test]
async fn already_answered_maps_to_409() {
    let (status, body) = response_parts(ApiError::AlreadyAnswered).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "already_answered");
}

#[tokio::test]
async fn validation_error_echoes_its_message() {
    let (status, body) =
        response_parts(ApiError::Validation("selectedIndex 9 is out of range".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation_error");
    assert_eq!(body["error"]["message"], "selectedIndex 9 is out of range");
}

#[tokio::test]
async fn storage_failures_hide_the_underlying_error() {
    let (status, body) = response_parts(ApiError::storage(anyhow::anyhow!(
        "redis: connection refused at 10.0.0.3:6379"
    )))
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["kind"], "storage_unavailable");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains("10.0.0.3"));
    assert_eq!(message, "storage temporarily unavailable");
}

#[tokio::test]
async fn timeout_maps_to_504() {
    let (status, body) = response_parts(ApiError::Timeout).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["kind"], "timeout");
}

#[tokio::test]
async fn classification_failure_maps_to_502() {
    let (status, body) = response_parts(ApiError::ClassificationFailed).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "classification_failed");
}
