//! Storefront Core: shared domain abstractions.
//!
//! This crate defines the traits and types that the notification context,
//! the broker binding, and the worker all depend on. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod queue;
