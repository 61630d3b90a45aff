//! Delivery outcomes.

use serde::Serialize;
use uuid::Uuid;

use super::events::{LifecycleKind, OrderId};

/// Result of attempting one channel for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    /// Name of the channel that was attempted.
    pub channel: &'static str,
    /// Whether the channel reported a successful delivery.
    pub success: bool,
    /// Failure detail, present only when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    /// A successful delivery.
    #[must_use]
    pub fn delivered(channel: &'static str) -> Self {
        Self {
            channel,
            success: true,
            error: None,
        }
    }

    /// A failed delivery.
    #[must_use]
    pub fn failed(channel: &'static str, error: impl Into<String>) -> Self {
        Self {
            channel,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Everything that happened while consuming one event.
///
/// Returned only when the event is to be acknowledged; channel failures are
/// listed here instead of being surfaced as errors.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeReport {
    /// The consumed event.
    pub event_id: Uuid,
    /// The order the event belongs to.
    pub order_id: OrderId,
    /// Which channel list was used.
    pub kind: LifecycleKind,
    /// One entry per attempted channel, in attempt order.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl ConsumeReport {
    /// Outcomes of channels that failed.
    pub fn failures(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Number of failed channels.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// True when every attempted channel delivered.
    #[must_use]
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }
}
