//! Storefront: order notification fan-out bounded context.
//!
//! Reacts to order lifecycle events received from the broker by driving
//! every delivery channel configured for the event's kind. Channel failures
//! are isolated and logged; only a failure to interpret the event itself is
//! reported back to the broker for redelivery.

pub mod application;
pub mod channels;
pub mod domain;
pub mod error;
