//! Storefront worker: library surface for the notification worker binary.
//!
//! Wires configuration, the broker poll loops, and the admin push server
//! around the `storefront-notifications` consumer.

pub mod config;
pub mod error;
pub mod retry;
pub mod routes;
pub mod runner;
pub mod state;
pub mod wiring;
