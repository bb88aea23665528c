use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::metrics::TELEMETRY_ENQUEUED_TOTAL;

pub const INTERACTIONS_QUEUE_KEY: &str = "interaction_logs";
pub const SESSION_STATS_QUEUE_KEY: &str = "session_stats";

/// Fire-and-forget producer side of a telemetry queue (a Redis list).
/// `enqueue` never blocks the caller and never fails the request path:
/// the push happens in a spawned task and failures are logged, not
/// propagated. Losing a telemetry event is preferable to slowing down
/// quiz-taking.
#[derive(Clone)]
pub struct IngestQueue {
    redis: ConnectionManager,
    key: &'static str,
}

impl IngestQueue {
    pub fn interactions(redis: ConnectionManager) -> Self {
        Self {
            redis,
            key: INTERACTIONS_QUEUE_KEY,
        }
    }

    pub fn session_stats(redis: ConnectionManager) -> Self {
        Self {
            redis,
            key: SESSION_STATS_QUEUE_KEY,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn enqueue<E: Serialize>(&self, event: &E) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(queue = self.key, error = %err, "failed to serialize telemetry event");
                TELEMETRY_ENQUEUED_TOTAL
                    .with_label_values(&[self.key, "error"])
                    .inc();
                return;
            }
        };

        let mut conn = self.redis.clone();
        let key = self.key;

        tokio::spawn(async move {
            let res: Result<i64, redis::RedisError> = redis::cmd("LPUSH")
                .arg(key)
                .arg(&payload)
                .query_async(&mut conn)
                .await;

            match res {
                Ok(_) => {
                    TELEMETRY_ENQUEUED_TOTAL
                        .with_label_values(&[key, "success"])
                        .inc();
                }
                Err(err) => {
                    // Swallowed: the producer already returned success.
                    tracing::warn!(queue = key, error = %err, "telemetry enqueue failed, event lost");
                    TELEMETRY_ENQUEUED_TOTAL
                        .with_label_values(&[key, "error"])
                        .inc();
                }
            }
        });
    }
}
