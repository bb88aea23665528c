use axum::{extract::State, response::IntoResponse, Json};
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::telemetry::SessionSummaryEvent;
use crate::models::{User, UserInfo};
use crate::services::AppState;

/// GET /admin/users - every registered user, without password hashes.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.mongo.collection::<User>("users");

    let mut cursor = users
        .find(doc! {})
        .await
        .map_err(|e| ApiError::storage(anyhow::Error::new(e)))?;

    let mut listed = Vec::new();
    while let Some(user) = cursor
        .try_next()
        .await
        .map_err(|e| ApiError::storage(anyhow::Error::new(e)))?
    {
        listed.push(UserInfo::from(user));
    }

    Ok(Json(json!({ "users": listed })))
}

/// GET /admin/session-stats - persisted session summaries, newest
/// first. The read surface for what the drain worker writes.
pub async fn list_session_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummaryEvent>>, ApiError> {
    let collection = state.mongo.collection::<SessionSummaryEvent>("session_stats");

    let mut cursor = collection
        .find(doc! {})
        .sort(doc! { "timestamp": -1 })
        .await
        .map_err(|e| ApiError::storage(anyhow::Error::new(e)))?;

    let mut stats = Vec::new();
    while let Some(summary) = cursor
        .try_next()
        .await
        .map_err(|e| ApiError::storage(anyhow::Error::new(e)))?
    {
        stats.push(summary);
    }

    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn user_listing_never_carries_the_password_hash() {
        let user = User {
            id: ObjectId::new(),
            username: "giaovien".to_string(),
            password: "$2b$12$secret-hash".to_string(),
            role: "ADMIN".to_string(),
        };

        let json = serde_json::to_string(&UserInfo::from(user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"username\":\"giaovien\""));
    }

    #[test]
    fn persisted_summary_roundtrips_with_the_mongo_id_ignored() {
        // insert_one adds an _id; the listing must not choke on it.
        let raw = r#"{"_id":{"$oid":"65f000000000000000000000"},"appear":20,"correct_pct":55.0,"wrong_pct":35.0,"skip_count":2,"avg_time_ms":910.5,"timestamp":1700000000000}"#;
        let summary: SessionSummaryEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.appear, 20);
        assert_eq!(summary.skip_count, 2);
    }
}
