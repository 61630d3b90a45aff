//! Domain layer for the notification context.

pub mod events;
pub mod outcome;
