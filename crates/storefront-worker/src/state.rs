//! State shared by the HTTP handlers.

use storefront_notifications::channels::BroadcastHub;

/// Cloned into every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Group fan-out shared with the realtime broadcast channel.
    pub hub: BroadcastHub,
    /// Number of broker poll loops running in this process.
    pub workers: usize,
}

impl AppState {
    /// Creates state around `hub` for a process running `workers` poll loops.
    #[must_use]
    pub fn new(hub: BroadcastHub, workers: usize) -> Self {
        Self { hub, workers }
    }
}
