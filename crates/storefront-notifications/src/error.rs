//! Error types for the notification context.

use thiserror::Error;

use crate::domain::events::LifecycleKind;

/// Failure raised by a single delivery channel.
///
/// These never escape the per-channel isolation boundary; they are recorded
/// as failed `DeliveryOutcome`s.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The underlying transport (SMTP relay, push connection) failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The recipient address could not be used.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The channel has nothing to deliver for this kind of event.
    #[error("channel {channel} does not handle {kind} events")]
    UnsupportedEvent {
        /// The channel that was asked to deliver.
        channel: &'static str,
        /// The event kind it was asked to deliver.
        kind: LifecycleKind,
    },

    /// The channel is a placeholder with no delivery implementation.
    #[error("{0} delivery is not supported")]
    NotSupported(&'static str),

    /// The channel panicked while delivering.
    #[error("channel panicked: {0}")]
    Panicked(String),
}

/// Failure to process a received event as a whole.
///
/// Every variant means the event could not be interpreted or orchestrated,
/// so the broker must redeliver it.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The message body could not be deserialized.
    #[error("malformed event payload: {0}")]
    Malformed(String),

    /// The message carries an event type this consumer does not know.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The event deserialized but violates its invariants.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// An unexpected fault outside any single channel.
    #[error("internal error: {0}")]
    Internal(String),
}
