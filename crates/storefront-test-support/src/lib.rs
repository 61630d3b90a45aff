//! Shared test mocks and utilities for the Storefront backend.

mod channels;
mod clock;
mod fixtures;
mod logging;
mod mail;
mod queue;

pub use channels::{FailingChannel, PanickingChannel, RecordingChannel};
pub use clock::{FixedClock, ManualClock};
pub use fixtures::{fixed_now, order_created_event, order_created_message, order_status_changed_event};
pub use logging::WarnCounter;
pub use mail::{FailingMailer, RecordingMailer};
pub use queue::InMemoryMessageQueue;
