use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::metrics::{ANSWERS_CHECKED_TOTAL, QUESTIONS_SERVED_TOTAL};
use crate::models::telemetry::{
    InteractionEvent, LogInteractionRequest, SessionStatsRequest, SessionSummaryEvent,
};
use crate::models::CheckAnswerRequest;
use crate::services::{
    distribution_queue::DistributionQueue,
    grading::{self, Submission, Verdict},
    question_bank::QuestionBank,
    turn_service::TurnService,
    AppState,
};
use crate::utils::time::epoch_millis;

/// Optional session identifier. When a client sends it, the server
/// tracks the Presented/Answered turn state: latency is measured
/// server-side and repeat submissions are rejected.
const SESSION_HEADER: &str = "x-quiz-session";

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Caps one storage/queue round-trip at the configured request budget.
async fn with_timeout<T, F>(budget: Duration, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| ApiError::Timeout)?
}

/// Builds the server-side interaction event for a session-tracked
/// submission. A rejected turn (repeat submission) propagates before
/// any event exists, so telemetry can never double-count.
fn interaction_from_turn(
    question_id: i64,
    is_correct: bool,
    skipped: bool,
    turn: Result<i64, ApiError>,
) -> Result<InteractionEvent, ApiError> {
    let latency_ms = turn?;
    Ok(InteractionEvent {
        question_id,
        is_correct,
        skipped,
        latency_ms,
        timestamp: epoch_millis(),
    })
}

/// GET /api/question - next question from the distribution queue, with
/// the answer key stripped.
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let budget = Duration::from_millis(state.config.request_timeout_ms);

    let bank = QuestionBank::new(state.mongo.clone());
    let queue = DistributionQueue::new(state.redis.clone(), QuestionBank::new(state.mongo.clone()));

    let question_id = with_timeout(budget, queue.next()).await?;

    let question = with_timeout(budget, async {
        bank.find_by_id(question_id).await.map_err(ApiError::storage)
    })
    .await?
    .ok_or_else(|| {
        // Queue entry survived a delete; the id is stale.
        ApiError::NotFound(format!("question {} does not exist", question_id))
    })?;

    if let Some(session) = session_id(&headers) {
        let turn = TurnService::new(state.redis.clone());
        with_timeout(budget, turn.record_presented(&session, question.id)).await?;
    }

    QUESTIONS_SERVED_TOTAL
        .with_label_values(&[question.subject.as_str()])
        .inc();

    Ok(Json(json!({ "question": question.sanitize() })))
}

/// POST /api/check-answer - grades a submission synchronously. With a
/// session header, also enforces one submission per presented question
/// and enqueues the interaction event server-side.
pub async fn check_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CheckAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let budget = Duration::from_millis(state.config.request_timeout_ms);
    let bank = QuestionBank::new(state.mongo.clone());

    let question = with_timeout(budget, async {
        bank.find_by_id(req.question_id)
            .await
            .map_err(ApiError::storage)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("question {} does not exist", req.question_id)))?;

    let verdict = if req.skipped {
        // A skip never reaches the grading engine.
        Verdict::incorrect()
    } else {
        let submission = Submission::from_request(question.question_type, &req)?;
        grading::grade(question.question_type, &question.content, &submission)?
    };

    ANSWERS_CHECKED_TOTAL
        .with_label_values(&[
            question.question_type.as_str(),
            if verdict.correct { "true" } else { "false" },
        ])
        .inc();

    if let Some(session) = session_id(&headers) {
        let turn = TurnService::new(state.redis.clone());
        let marked = with_timeout(budget, turn.mark_answered(&session, question.id)).await;

        let event = interaction_from_turn(question.id, verdict.correct, req.skipped, marked)?;
        state.interactions.enqueue(&event);
    }

    Ok(Json(verdict))
}

/// POST /api/interactions - client-reported interaction event.
/// Always 201 for a well-typed body; persistence is best-effort.
pub async fn log_interaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogInteractionRequest>,
) -> impl IntoResponse {
    let event = InteractionEvent {
        question_id: req.question_id,
        is_correct: req.correct,
        skipped: req.skipped,
        latency_ms: req.latency_ms,
        timestamp: epoch_millis(),
    };

    state.interactions.enqueue(&event);

    (StatusCode::CREATED, Json(json!({ "status": "ok" })))
}

/// POST /api/session-stats - aggregate counters at session end, same
/// best-effort semantics.
pub async fn log_session_stats(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionStatsRequest>,
) -> impl IntoResponse {
    let event = SessionSummaryEvent {
        appear: req.appear,
        correct_pct: req.correct_pct,
        wrong_pct: req.wrong_pct,
        skip_count: req.skip,
        avg_time_ms: req.avg_time_ms,
        timestamp: epoch_millis(),
    };

    state.session_stats.enqueue(&event);

    (StatusCode::CREATED, Json(json!({ "saved": true })))
}
