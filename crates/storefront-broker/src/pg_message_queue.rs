//! `PostgreSQL` implementation of the `MessageQueue` trait.
//!
//! Messages live in `order_event_queue`. A receiver claims the oldest
//! visible `pending` row with `FOR UPDATE SKIP LOCKED`, so concurrent workers
//! never claim the same message, and pushes its `visible_at` forward by the
//! visibility timeout. Acknowledging deletes the row; a crashed worker's
//! claim simply lapses and the row is handed out again, unless it has
//! already been delivered `max_attempts` times, in which case it is
//! dead-lettered instead.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use storefront_core::error::DomainError;
use storefront_core::queue::{MessageQueue, QueuedMessage, Redelivery};

/// Default number of deliveries before a message is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

const STATUS_DEAD: &str = "dead";

const LAPSED_CLAIM_ERROR: &str = "claim lapsed after final delivery attempt";

#[derive(FromRow)]
struct QueueRow {
    message_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    attempts: i32,
    enqueued_at: DateTime<Utc>,
}

impl From<QueueRow> for QueuedMessage {
    fn from(row: QueueRow) -> Self {
        Self {
            message_id: row.message_id,
            event_type: row.event_type,
            payload: row.payload,
            attempts: row.attempts,
            enqueued_at: row.enqueued_at,
        }
    }
}

/// PostgreSQL-backed message queue.
#[derive(Debug, Clone)]
pub struct PgMessageQueue {
    pool: PgPool,
    max_attempts: i32,
}

impl PgMessageQueue {
    /// Creates a queue that dead-letters after [`DEFAULT_MAX_ATTEMPTS`].
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_max_attempts(pool, DEFAULT_MAX_ATTEMPTS)
    }

    /// Creates a queue that dead-letters after `max_attempts` deliveries.
    #[must_use]
    pub fn with_max_attempts(pool: PgPool, max_attempts: i32) -> Self {
        Self {
            pool,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Number of dead-lettered messages.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    pub async fn dead_letter_count(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM order_event_queue WHERE status = $1")
            .bind(STATUS_DEAD)
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("message queue: {err}"))
}

#[async_trait]
impl MessageQueue for PgMessageQueue {
    async fn publish(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Uuid, DomainError> {
        let message_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO order_event_queue (message_id, event_type, payload) VALUES ($1, $2, $3)",
        )
        .bind(message_id)
        .bind(event_type)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        tracing::debug!(%message_id, event_type, "message published");
        Ok(message_id)
    }

    async fn receive(
        &self,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage>, DomainError> {
        let exhausted = sqlx::query(
            r"
            UPDATE order_event_queue
            SET status = 'dead',
                last_error = COALESCE(last_error, $2)
            WHERE status = 'pending' AND visible_at <= NOW() AND attempts >= $1
            ",
        )
        .bind(self.max_attempts)
        .bind(LAPSED_CLAIM_ERROR)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?
        .rows_affected();
        if exhausted > 0 {
            tracing::warn!(count = exhausted, "lapsed claims dead-lettered");
        }

        let row: Option<QueueRow> = sqlx::query_as(
            r"
            UPDATE order_event_queue
            SET attempts = attempts + 1,
                visible_at = NOW() + make_interval(secs => $1)
            WHERE message_id = (
                SELECT message_id FROM order_event_queue
                WHERE status = 'pending' AND visible_at <= NOW() AND attempts < $2
                ORDER BY visible_at, enqueued_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING message_id, event_type, payload, attempts, enqueued_at
            ",
        )
        .bind(visibility_timeout.as_secs_f64())
        .bind(self.max_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(row.map(QueuedMessage::from))
    }

    async fn acknowledge(&self, message_id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM order_event_queue WHERE message_id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("queue message {message_id}")));
        }
        Ok(())
    }

    async fn redeliver(
        &self,
        message_id: Uuid,
        delay: Duration,
        reason: &str,
    ) -> Result<Redelivery, DomainError> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            r"
            UPDATE order_event_queue
            SET status = CASE WHEN attempts >= $3 THEN 'dead' ELSE 'pending' END,
                visible_at = CASE
                    WHEN attempts >= $3 THEN visible_at
                    ELSE NOW() + make_interval(secs => $2)
                END,
                last_error = $4
            WHERE message_id = $1 AND status = 'pending'
            RETURNING status, visible_at
            ",
        )
        .bind(message_id)
        .bind(delay.as_secs_f64())
        .bind(self.max_attempts)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        match row {
            None => Err(DomainError::NotFound(format!("queue message {message_id}"))),
            Some((status, _)) if status == STATUS_DEAD => Ok(Redelivery::DeadLettered),
            Some((_, available_at)) => Ok(Redelivery::Scheduled { available_at }),
        }
    }
}
