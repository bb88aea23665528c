use std::time::Duration;

use anyhow::anyhow;
use rand::seq::SliceRandom;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use super::question_bank::QuestionBank;
use crate::error::ApiError;
use crate::metrics::QUEUE_REFILLS_TOTAL;

const QUEUE_KEY: &str = "questions_queue";
const REFILL_LOCK_KEY: &str = "questions_queue:refill_lock";
const REFILL_LOCK_TTL_MS: u64 = 10_000;

/// Upper bound on the length-check/refill/pop cycle. Each lost race
/// sleeps briefly, so this is generous; hitting it means Redis is
/// misbehaving, not that the bank is empty.
const MAX_NEXT_ATTEMPTS: usize = 10;
const LOST_RACE_BACKOFF: Duration = Duration::from_millis(50);

/// Shared shuffled work-queue of question ids. Every id in the bank is
/// served exactly once per shuffle cycle; when the queue drains it is
/// refilled with a fresh permutation.
///
/// Refill discipline: single-writer. The first caller to observe an
/// empty queue takes a short-lived Redis lock, pushes the whole
/// shuffled id set with one RPUSH, then releases the lock. Losers back
/// off and retry the length check. If the lock ever expires mid-refill
/// a second refill may interleave extra ids; that duplication is
/// harmless (ids repeat across cycles anyway) and never corrupts the
/// queue.
pub struct DistributionQueue {
    redis: ConnectionManager,
    bank: QuestionBank,
}

impl DistributionQueue {
    pub fn new(redis: ConnectionManager, bank: QuestionBank) -> Self {
        Self { redis, bank }
    }

    /// Pops the next question id, refilling the queue when it drains.
    /// Fails with `EmptyBank` only when the bank has zero questions;
    /// transient pop races are retried internally.
    pub async fn next(&self) -> Result<i64, ApiError> {
        let mut conn = self.redis.clone();

        for _ in 0..MAX_NEXT_ATTEMPTS {
            let len: i64 = redis::cmd("LLEN")
                .arg(QUEUE_KEY)
                .query_async(&mut conn)
                .await
                .map_err(ApiError::storage)?;

            if len == 0 {
                self.refill(&mut conn).await?;
            }

            let popped: Option<String> = redis::cmd("LPOP")
                .arg(QUEUE_KEY)
                .query_async(&mut conn)
                .await
                .map_err(ApiError::storage)?;

            if let Some(raw) = popped {
                let id = raw.parse::<i64>().map_err(|_| {
                    ApiError::storage(anyhow!("queue entry is not a question id: {raw}"))
                })?;
                return Ok(id);
            }

            // Lost the pop race to a concurrent consumer; re-check the
            // length and try again.
            tokio::time::sleep(LOST_RACE_BACKOFF).await;
        }

        Err(ApiError::storage(anyhow!(
            "distribution queue stayed empty after {MAX_NEXT_ATTEMPTS} attempts"
        )))
    }

    async fn refill(&self, conn: &mut ConnectionManager) -> Result<(), ApiError> {
        let nonce = Uuid::new_v4().to_string();

        let acquired: Option<String> = redis::cmd("SET")
            .arg(REFILL_LOCK_KEY)
            .arg(&nonce)
            .arg("NX")
            .arg("PX")
            .arg(REFILL_LOCK_TTL_MS)
            .query_async(conn)
            .await
            .map_err(ApiError::storage)?;

        if acquired.is_none() {
            // Another request is already refilling; let it finish.
            tokio::time::sleep(LOST_RACE_BACKOFF).await;
            return Ok(());
        }

        let result = self.push_shuffled(conn).await;

        // Release only our own lock; if it already expired another
        // holder may own the key.
        let release = redis::Script::new(
            r#"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            end
            return 0
        "#,
        );
        if let Err(err) = release
            .key(REFILL_LOCK_KEY)
            .arg(&nonce)
            .invoke_async::<i64>(conn)
            .await
        {
            tracing::warn!(error = %err, "failed to release refill lock, it will expire");
        }

        result
    }

    async fn push_shuffled(&self, conn: &mut ConnectionManager) -> Result<(), ApiError> {
        let ids = self.bank.find_all_ids().await.map_err(ApiError::storage)?;

        if ids.is_empty() {
            QUEUE_REFILLS_TOTAL.with_label_values(&["empty_bank"]).inc();
            return Err(ApiError::EmptyBank);
        }

        let shuffled = shuffle_ids(ids);

        // One RPUSH for the whole batch: the refill is atomic from the
        // point of view of concurrent LPOPs.
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(QUEUE_KEY);
        for id in &shuffled {
            cmd.arg(id.to_string());
        }
        cmd.query_async::<i64>(conn)
            .await
            .map_err(ApiError::storage)?;

        QUEUE_REFILLS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(count = shuffled.len(), "distribution queue refilled");

        Ok(())
    }
}

/// Uniform random permutation (Fisher-Yates via `SliceRandom`).
fn shuffle_ids(mut ids: Vec<i64>) -> Vec<i64> {
    ids.shuffle(&mut rand::rng());
    ids
}
