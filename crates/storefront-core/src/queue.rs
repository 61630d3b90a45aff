//! Message broker abstraction.
//!
//! A `MessageQueue` is the durable, at-least-once transport between the
//! order workflow (publisher) and the notification consumer. Returning a
//! message through `acknowledge` removes it; `redeliver` hands it back to the
//! broker's retry policy.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// A message claimed from the queue.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Broker-assigned message identifier.
    pub message_id: Uuid,
    /// Event type name used to route the payload to a decoder.
    pub event_type: String,
    /// Serialized event body.
    pub payload: serde_json::Value,
    /// Number of times this message has been handed out, including this one.
    pub attempts: i32,
    /// When the message was first published.
    pub enqueued_at: DateTime<Utc>,
}

/// What the broker did with a message handed back via `redeliver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redelivery {
    /// The message will become visible again at `available_at`.
    Scheduled {
        /// Earliest time the message can be received again.
        available_at: DateTime<Utc>,
    },
    /// Delivery attempts are exhausted; the message was moved aside.
    DeadLettered,
}

/// Durable queue used to carry order lifecycle events.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publishes a message and returns its identifier.
    async fn publish(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Uuid, DomainError>;

    /// Claims the next visible message, hiding it from other receivers for
    /// `visibility_timeout`. A claimed message that is neither acknowledged
    /// nor redelivered becomes visible again once the timeout lapses.
    async fn receive(
        &self,
        visibility_timeout: Duration,
    ) -> Result<Option<QueuedMessage>, DomainError>;

    /// Removes a processed message.
    async fn acknowledge(&self, message_id: Uuid) -> Result<(), DomainError>;

    /// Returns a message to the queue after `delay`, or dead-letters it when
    /// its attempts are exhausted.
    async fn redeliver(
        &self,
        message_id: Uuid,
        delay: Duration,
        reason: &str,
    ) -> Result<Redelivery, DomainError>;
}
