//! The order event consumer.
//!
//! Processing is a single-shot, stateless reaction to one received event:
//! validate, attempt every channel configured for the event's kind in
//! order, and report. Channel failures are recorded in the report and the
//! event is still acknowledged; only errors outside the per-channel boundary
//! are returned, and those ask the broker to redeliver.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::channel::{ChannelSet, attempt_delivery};
use crate::domain::events::OrderLifecycleEvent;
use crate::domain::outcome::ConsumeReport;
use crate::error::ConsumeError;
use storefront_core::event::DomainEvent;

/// Terminal signal returned to the broker binding for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Processed; remove the message.
    Acknowledge,
    /// Could not be interpreted; deliver it again.
    Redeliver,
}

impl From<&Result<ConsumeReport, ConsumeError>> for Acknowledgement {
    fn from(result: &Result<ConsumeReport, ConsumeError>) -> Self {
        match result {
            Ok(_) => Self::Acknowledge,
            Err(_) => Self::Redeliver,
        }
    }
}

/// Drives the configured channel set for each received event.
///
/// Cheap to clone; clones share the same channel set and may consume
/// events concurrently.
#[derive(Debug, Clone)]
pub struct OrderEventConsumer {
    channels: Arc<ChannelSet>,
}

impl OrderEventConsumer {
    /// Creates a consumer over `channels`.
    #[must_use]
    pub fn new(channels: ChannelSet) -> Self {
        Self {
            channels: Arc::new(channels),
        }
    }

    /// The channels this consumer drives.
    #[must_use]
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Consumes one event.
    ///
    /// Channels are attempted sequentially in configured order; every
    /// channel is attempted regardless of earlier failures.
    ///
    /// # Errors
    ///
    /// Returns `ConsumeError::InvalidEvent` if the event violates its payload
    /// invariant. No channel is attempted in that case.
    #[tracing::instrument(
        name = "consume_order_event",
        skip_all,
        fields(
            order_id = %event.order_id(),
            event_id = %event.metadata().event_id,
            kind = %event.lifecycle_kind(),
        )
    )]
    pub async fn consume(
        &self,
        event: &OrderLifecycleEvent,
    ) -> Result<ConsumeReport, ConsumeError> {
        event
            .validate()
            .map_err(|e| ConsumeError::InvalidEvent(e.to_string()))?;

        let kind = event.lifecycle_kind();
        let channels = self.channels.for_kind(kind);
        if channels.is_empty() {
            debug!("no delivery channels configured for event kind");
        }

        let mut outcomes = Vec::with_capacity(channels.len());
        for channel in channels {
            outcomes.push(attempt_delivery(channel.as_ref(), event).await);
        }

        let report = ConsumeReport {
            event_id: event.metadata().event_id,
            order_id: event.order_id().clone(),
            kind,
            outcomes,
        };
        info!(
            attempted = report.outcomes.len(),
            failed = report.failure_count(),
            "order event processed"
        );
        Ok(report)
    }

    /// Decodes a broker message body and consumes it.
    ///
    /// # Errors
    ///
    /// Returns `ConsumeError::UnknownEventType`, `ConsumeError::Malformed`, or
    /// `ConsumeError::InvalidEvent` when the body cannot be interpreted.
    pub async fn consume_message(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<ConsumeReport, ConsumeError> {
        let event = OrderLifecycleEvent::decode(event_type, payload)?;
        self.consume(&event).await
    }
}
