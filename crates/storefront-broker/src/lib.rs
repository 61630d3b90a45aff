//! Storefront Broker: PostgreSQL-backed durable queue.
//!
//! Carries order lifecycle events from the order workflow to the
//! notification worker with at-least-once delivery.

pub mod pg_message_queue;
