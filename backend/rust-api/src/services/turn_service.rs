use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::utils::time::epoch_millis;

const TURN_TTL_SECS: u64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct TurnState {
    question_id: i64,
    presented_at_ms: i64,
}

/// Tracks the Presented -> Answered transition of a quiz turn for
/// callers that identify themselves with a session id. The answered
/// marker is a `SET NX`, so a second submission for the same presented
/// question loses atomically and gets `AlreadyAnswered` back.
pub struct TurnService {
    redis: ConnectionManager,
}

impl TurnService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Records that `question_id` was just presented to this session.
    pub async fn record_presented(&self, session: &str, question_id: i64) -> Result<(), ApiError> {
        let mut conn = self.redis.clone();

        let state = TurnState {
            question_id,
            presented_at_ms: epoch_millis(),
        };
        let payload = serde_json::to_string(&state)
            .map_err(|e| ApiError::storage(anyhow::Error::from(e)))?;

        redis::cmd("SETEX")
            .arg(turn_key(session))
            .arg(TURN_TTL_SECS)
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(ApiError::storage)?;

        Ok(())
    }

    /// Marks the question answered for this session and returns the
    /// latency since it was presented (0 if the presented record is
    /// gone or belongs to a different question).
    pub async fn mark_answered(&self, session: &str, question_id: i64) -> Result<i64, ApiError> {
        let mut conn = self.redis.clone();

        let set: Option<String> = redis::cmd("SET")
            .arg(answered_key(session, question_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(TURN_TTL_SECS)
            .query_async(&mut conn)
            .await
            .map_err(ApiError::storage)?;

        gate_submission(set)?;

        let raw: Option<String> = redis::cmd("GET")
            .arg(turn_key(session))
            .query_async(&mut conn)
            .await
            .map_err(ApiError::storage)?;

        Ok(resolve_latency(raw, question_id, epoch_millis()))
    }
}

/// The `SET NX` reply decides the turn: only the first submission sees
/// a non-nil reply, every later one is rejected.
fn gate_submission(setnx_reply: Option<String>) -> Result<(), ApiError> {
    match setnx_reply {
        Some(_) => Ok(()),
        None => Err(ApiError::AlreadyAnswered),
    }
}

/// Latency from the stored presented record. Falls back to 0 when the
/// record expired, belongs to another question, or the clocks ran
/// backwards.
fn resolve_latency(raw: Option<String>, question_id: i64, now_ms: i64) -> i64 {
    raw.and_then(|json| serde_json::from_str::<TurnState>(&json).ok())
        .filter(|state| state.question_id == question_id)
        .map(|state| (now_ms - state.presented_at_ms).max(0))
        .unwrap_or(0)
}

fn turn_key(session: &str) -> String {
    format!("turn:{}", session)
}

fn answered_key(session: &str, question_id: i64) -> String {
    format!("turn:answered:{}:{}", session, question_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_per_session_and_question() {
        assert_eq!(turn_key("abc"), "turn:abc");
        assert_eq!(answered_key("abc", 7), "turn:answered:abc:7");
        assert_ne!(answered_key("abc", 7), answered_key("abc", 8));
    }

    #[test]
    fn first_submission_passes_the_gate() {
        assert!(gate_submission(Some("OK".to_string())).is_ok());
    }

    #[test]
    fn repeat_submission_is_rejected() {
        let err = gate_submission(None).unwrap_err();
        assert_eq!(err.kind(), "already_answered");
    }

    #[test]
    fn latency_is_measured_from_the_presented_record() {
        let raw = serde_json::to_string(&TurnState {
            question_id: 7,
            presented_at_ms: 1_000,
        })
        .unwrap();
        assert_eq!(resolve_latency(Some(raw), 7, 1_840), 840);
    }

    #[test]
    fn latency_falls_back_to_zero() {
        // No presented record at all.
        assert_eq!(resolve_latency(None, 7, 1_840), 0);

        // Record belongs to a different question.
        let other = serde_json::to_string(&TurnState {
            question_id: 8,
            presented_at_ms: 1_000,
        })
        .unwrap();
        assert_eq!(resolve_latency(Some(other), 7, 1_840), 0);

        // Clock skew must not produce negative latency.
        let future = serde_json::to_string(&TurnState {
            question_id: 7,
            presented_at_ms: 2_000,
        })
        .unwrap();
        assert_eq!(resolve_latency(Some(future), 7, 1_840), 0);

        // Unparsable record is treated as missing.
        assert_eq!(resolve_latency(Some("garbage".to_string()), 7, 1_840), 0);
    }

    #[test]
    fn turn_state_roundtrips() {
        let state = TurnState {
            question_id: 12,
            presented_at_ms: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: TurnState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.question_id, 12);
        assert_eq!(back.presented_at_ms, state.presented_at_ms);
    }
}
