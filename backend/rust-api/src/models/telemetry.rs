use serde::{Deserialize, Serialize};

/// One graded (or skipped) question interaction. This is both the queue
/// payload and the persisted document, snake_case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub question_id: i64,
    pub is_correct: bool,
    pub skipped: bool,
    pub latency_ms: i64,
    pub timestamp: i64,
}

/// Aggregate counters for one finished quiz session, reported by the
/// client at session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummaryEvent {
    pub appear: i64,
    pub correct_pct: f64,
    pub wrong_pct: f64,
    pub skip_count: i64,
    pub avg_time_ms: f64,
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInteractionRequest {
    pub question_id: i64,
    pub correct: bool,
    pub skipped: bool,
    pub latency_ms: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatsRequest {
    pub appear: i64,
    pub correct_pct: f64,
    pub wrong_pct: f64,
    pub skip: i64,
    pub avg_time_ms: f64,
}
