//! Application layer: channel abstraction and the event consumer.

pub mod channel;
pub mod consumer;
