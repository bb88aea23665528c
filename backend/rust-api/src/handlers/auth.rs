use axum::{extract::State, response::IntoResponse, Json};
use mongodb::bson::doc;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::{LoginRequest, LoginResponse, User, UserInfo};
use crate::services::AppState;

const TOKEN_TTL_SECS: i64 = 4 * 3600;

/// POST /auth/login - username/password against the users collection,
/// bcrypt-verified. Returns a bearer token plus the user's public info.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let users = state.mongo.collection::<User>("users");

    let user = users
        .find_one(doc! { "username": &req.username })
        .await
        .map_err(|e| ApiError::storage(anyhow::Error::new(e)))?
        // Same response whether the user is unknown or the password is
        // wrong, so usernames cannot be enumerated.
        .ok_or(ApiError::Unauthenticated)?;

    let matches = bcrypt::verify(&req.password, &user.password).map_err(|e| {
        tracing::error!(error = %e, "bcrypt verification failed");
        ApiError::Unauthenticated
    })?;

    if !matches {
        tracing::debug!(username = %req.username, "login rejected: bad password");
        return Err(ApiError::Unauthenticated);
    }

    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user.id.to_hex(),
        username: user.username.clone(),
        role: user.role.clone(),
        exp: (now + TOKEN_TTL_SECS) as usize,
        iat: now as usize,
    };

    let token = JwtService::new(&state.config.jwt_secret)
        .generate_token(claims)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to issue token");
            ApiError::storage(anyhow::anyhow!("token generation failed"))
        })?;

    tracing::info!(username = %user.username, role = %user.role, "login successful");

    Ok(Json(LoginResponse {
        token,
        user: UserInfo::from(user),
    }))
}
