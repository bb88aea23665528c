use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{Context, Result};
use mongodb::{Collection, Database};
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::metrics::{DRAIN_WORKER_TICKS_TOTAL, TELEMETRY_DRAINED_TOTAL};
use crate::models::telemetry::{InteractionEvent, SessionSummaryEvent};
use crate::services::ingest::{INTERACTIONS_QUEUE_KEY, SESSION_STATS_QUEUE_KEY};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Consumer side of one telemetry queue: pops events, parses them and
/// persists them into MongoDB. Runs forever until the shutdown flag
/// flips; exactly one instance per queue per deployment.
///
/// Failure semantics are deliberately lossy-tolerant: a payload that
/// does not parse is dropped immediately (it cannot self-heal), and a
/// persist that still fails after bounded retries is dropped too.
/// At-least-once delivery is NOT guaranteed; this subsystem trades
/// durability for producer availability.
pub struct DrainWorker<E> {
    redis: ConnectionManager,
    mongo: Database,
    queue_key: &'static str,
    collection: &'static str,
    poll_interval: Duration,
    _event: PhantomData<E>,
}

impl DrainWorker<InteractionEvent> {
    pub fn interactions(redis: ConnectionManager, mongo: Database, poll_interval: Duration) -> Self {
        Self::new(redis, mongo, INTERACTIONS_QUEUE_KEY, "interaction_logs", poll_interval)
    }
}

impl DrainWorker<SessionSummaryEvent> {
    pub fn session_stats(redis: ConnectionManager, mongo: Database, poll_interval: Duration) -> Self {
        Self::new(redis, mongo, SESSION_STATS_QUEUE_KEY, "session_stats", poll_interval)
    }
}

impl<E> DrainWorker<E>
where
    E: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        redis: ConnectionManager,
        mongo: Database,
        queue_key: &'static str,
        collection: &'static str,
        poll_interval: Duration,
    ) -> Self {
        Self {
            redis,
            mongo,
            queue_key,
            collection,
            poll_interval,
            _event: PhantomData,
        }
    }

    /// Drain loop: pop, parse, persist. Blocks with an idle back-off
    /// when the queue is empty instead of busy-spinning. A flipped
    /// shutdown flag stops the loop after the in-flight event has been
    /// handled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(queue = self.queue_key, "drain worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.drain_one().await {
                Ok(true) => {
                    DRAIN_WORKER_TICKS_TOTAL
                        .with_label_values(&[self.queue_key, "success"])
                        .inc();
                }
                Ok(false) => {
                    // Queue empty: idle back-off, woken early by shutdown.
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(err) => {
                    DRAIN_WORKER_TICKS_TOTAL
                        .with_label_values(&[self.queue_key, "error"])
                        .inc();
                    warn!(queue = self.queue_key, error = %err, "drain worker tick failed");
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!(queue = self.queue_key, "drain worker stopped");
        Ok(())
    }

    /// Returns Ok(false) when the queue was empty, Ok(true) when one
    /// event was consumed (whatever its fate).
    async fn drain_one(&self) -> Result<bool> {
        let mut conn = self.redis.clone();

        let raw: Option<String> = redis::cmd("RPOP")
            .arg(self.queue_key)
            .query_async(&mut conn)
            .await
            .context("Failed to pop from telemetry queue")?;

        let event: E = match next_step(raw) {
            DrainStep::QueueEmpty => return Ok(false),
            DrainStep::Discard { payload, error } => {
                warn!(queue = self.queue_key, error = %error, payload = %payload, "malformed telemetry event dropped");
                TELEMETRY_DRAINED_TOTAL
                    .with_label_values(&[self.queue_key, "malformed"])
                    .inc();
                return Ok(true);
            }
            DrainStep::Persist(event) => event,
        };

        let collection: Collection<E> = self.mongo.collection(self.collection);

        let res: Result<(), mongodb::error::Error> =
            retry_async_with_config(RetryConfig::persist(), || async {
                collection.insert_one(&event).await.map(|_| ())
            })
            .await;

        match res {
            Ok(()) => {
                TELEMETRY_DRAINED_TOTAL
                    .with_label_values(&[self.queue_key, "persisted"])
                    .inc();
            }
            Err(err) => {
                // Event is lost at this point; see the struct docs for
                // the durability trade-off.
                error!(queue = self.queue_key, error = %err, "failed to persist telemetry event, dropped");
                TELEMETRY_DRAINED_TOTAL
                    .with_label_values(&[self.queue_key, "persist_failed"])
                    .inc();
            }
        }

        Ok(true)
    }
}

/// What the drain loop does with one popped payload.
enum DrainStep<E> {
    QueueEmpty,
    Discard {
        payload: String,
        error: serde_json::Error,
    },
    Persist(E),
}

/// Pure classification of a popped payload: nothing popped means the
/// queue is idle; an unparsable payload is consumed but never persisted.
fn next_step<E: DeserializeOwned>(popped: Option<String>) -> DrainStep<E> {
    match popped {
        None => DrainStep::QueueEmpty,
        Some(payload) => match serde_json::from_str(&payload) {
            Ok(event) => DrainStep::Persist(event),
            Err(error) => DrainStep::Discard { payload, error },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn event_json(question_id: i64) -> String {
        serde_json::to_string(&InteractionEvent {
            question_id,
            is_correct: true,
            skipped: false,
            latency_ms: 120,
            timestamp: 1_700_000_000_000,
        })
        .unwrap()
    }

    #[test]
    fn empty_queue_yields_an_idle_step() {
        assert!(matches!(
            next_step::<InteractionEvent>(None),
            DrainStep::QueueEmpty
        ));
    }

    #[test]
    fn malformed_payload_is_consumed_but_not_persisted() {
        let step = next_step::<InteractionEvent>(Some("{not json".to_string()));
        assert!(matches!(step, DrainStep::Discard { .. }));

        // Well-formed JSON of the wrong shape is dropped the same way.
        let wrong_shape = next_step::<InteractionEvent>(Some(r#"{"foo":1}"#.to_string()));
        assert!(matches!(wrong_shape, DrainStep::Discard { .. }));
    }

    #[test]
    fn valid_payload_is_persisted_intact() {
        let step = next_step::<InteractionEvent>(Some(event_json(42)));
        match step {
            DrainStep::Persist(event) => {
                assert_eq!(event.question_id, 42);
                assert_eq!(event.latency_ms, 120);
            }
            _ => panic!("expected a persist step"),
        }
    }

    #[test]
    fn every_enqueued_event_drains_exactly_once() {
        // Producer side: N distinct events queued (LPUSH pairs with
        // RPOP, so a Vec drained front-to-back models the list).
        let mut queue: Vec<String> = (1..=50).map(event_json).collect();

        let mut persisted = Vec::new();
        loop {
            let popped = if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            };
            match next_step::<InteractionEvent>(popped) {
                DrainStep::QueueEmpty => break,
                DrainStep::Persist(event) => persisted.push(event.question_id),
                DrainStep::Discard { .. } => panic!("valid events must not be dropped"),
            }
        }

        assert_eq!(persisted.len(), 50);
        let unique: BTreeSet<i64> = persisted.iter().copied().collect();
        assert_eq!(unique.len(), 50, "no event may drain twice");
    }
}
