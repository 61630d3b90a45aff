//! In-memory `MessageQueue` with the same delivery contract as the
//! PostgreSQL queue: claimed messages are hidden for the visibility timeout,
//! acknowledged messages are removed, and redelivery past `max_attempts`
//! dead-letters the message. So does a lapsed claim on the final attempt.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storefront_core::clock::{Clock, SystemClock};
use storefront_core::error::DomainError;
use storefront_core::queue::{MessageQueue, QueuedMessage, Redelivery};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Entry {
    message: QueuedMessage,
    visible_at: DateTime<Utc>,
    dead: bool,
    last_error: Option<String>,
}

/// An in-process message queue for tests.
pub struct InMemoryMessageQueue {
    entries: Mutex<Vec<Entry>>,
    max_attempts: i32,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageQueue {
    /// Create an empty queue on the system clock that dead-letters after
    /// `max_attempts` deliveries.
    #[must_use]
    pub fn new(max_attempts: i32) -> Self {
        Self::with_clock(max_attempts, Arc::new(SystemClock))
    }

    /// Create an empty queue whose visibility deadlines follow `clock`.
    #[must_use]
    pub fn with_clock(max_attempts: i32, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_attempts,
            clock,
        }
    }

    /// Messages not yet acknowledged or dead-lettered.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn pending(&self) -> Vec<QueuedMessage> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.dead)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Dead-lettered messages with their last recorded error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn dead_letters(&self) -> Vec<(QueuedMessage, Option<String>)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.dead)
            .map(|e| (e.message.clone(), e.last_error.clone()))
            .collect()
    }
}

impl std::fmt::Debug for InMemoryMessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageQueue")
            .field("entries", &self.entries)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Uuid, DomainError> {
        let now = self.clock.now();
        let message_id = Uuid::new_v4();
        self.entries.lock().unwrap().push(Entry {
            message: QueuedMessage {
                message_id,
                event_type: event_type.to_owned(),
                payload,
                attempts: 0,
                enqueued_at: now,
            },
            visible_at: now,
            dead: false,
            last_error: None,
        });
        Ok(message_id)
    }

    async fn receive(
        &self,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage>, DomainError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut().filter(|e| {
            !e.dead && e.visible_at <= now && e.message.attempts >= self.max_attempts
        }) {
            entry.dead = true;
            entry
                .last_error
                .get_or_insert_with(|| "claim lapsed after final delivery attempt".to_owned());
        }
        let Some(entry) = entries
            .iter_mut()
            .find(|e| !e.dead && e.visible_at <= now)
        else {
            return Ok(None);
        };
        entry.message.attempts += 1;
        entry.visible_at = self.clock.after(visibility_timeout);
        Ok(Some(entry.message.clone()))
    }

    async fn acknowledge(&self, message_id: Uuid) -> Result<(), DomainError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.message.message_id != message_id);
        if entries.len() == before {
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
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.message.message_id == message_id)
            .ok_or_else(|| DomainError::NotFound(format!("queue message {message_id}")))?;
        entry.last_error = Some(reason.to_owned());
        if entry.message.attempts >= self.max_attempts {
            entry.dead = true;
            return Ok(Redelivery::DeadLettered);
        }
        let available_at = self.clock.after(delay);
        entry.visible_at = available_at;
        Ok(Redelivery::Scheduled { available_at })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::fixtures::fixed_now;

    #[tokio::test]
    async fn test_claimed_message_reappears_after_visibility_timeout() {
        // Arrange
        let clock = Arc::new(ManualClock::new(fixed_now()));
        let queue = InMemoryMessageQueue::with_clock(5, clock.clone());
        let message_id = queue.publish("OrderCreated", json!({})).await.unwrap();
        queue.receive(Duration::from_secs(60)).await.unwrap();

        // Act
        let hidden = queue.receive(Duration::from_secs(60)).await.unwrap();
        clock.advance(Duration::from_secs(61));
        let again = queue.receive(Duration::from_secs(60)).await.unwrap();

        // Assert
        assert!(hidden.is_none());
        let again = again.unwrap();
        assert_eq!(again.message_id, message_id);
        assert_eq!(again.attempts, 2);
    }

    #[tokio::test]
    async fn test_redeliver_past_max_attempts_dead_letters() {
        let queue = InMemoryMessageQueue::new(1);
        let message_id = queue.publish("OrderCreated", json!({})).await.unwrap();
        queue.receive(Duration::from_secs(60)).await.unwrap();

        let outcome = queue
            .redeliver(message_id, Duration::ZERO, "bad payload")
            .await
            .unwrap();

        assert_eq!(outcome, Redelivery::DeadLettered);
        assert_eq!(queue.dead_letters()[0].1.as_deref(), Some("bad payload"));
        assert!(queue.pending().is_empty());
    }

    #[tokio::test]
    async fn test_lapsed_claim_on_final_attempt_dead_letters() {
        // Arrange
        let clock = Arc::new(ManualClock::new(fixed_now()));
        let queue = InMemoryMessageQueue::with_clock(2, clock.clone());
        let message_id = queue.publish("OrderCreated", json!({})).await.unwrap();
        for _ in 0..2 {
            queue.receive(Duration::from_secs(60)).await.unwrap().unwrap();
            clock.advance(Duration::from_secs(61));
        }

        // Act
        let claimed = queue.receive(Duration::from_secs(60)).await.unwrap();

        // Assert
        assert!(claimed.is_none());
        assert!(queue.pending().is_empty());
        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].0.message_id, message_id);
        assert_eq!(dead[0].0.attempts, 2);
    }
}
