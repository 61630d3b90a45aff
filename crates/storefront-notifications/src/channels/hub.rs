//! Group-keyed realtime fan-out.
//!
//! ```text
//! RealtimeBroadcastChannel ──send_to_group("Admins")──▶ BroadcastHub
//!                                                        │ broadcast::Sender per group
//!                                                        ▼
//!                                          websocket sessions (subscribe)
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

/// Audience group of store administrators.
pub const ADMINS_GROUP: &str = "Admins";

/// Per-group buffer; slow subscribers beyond this lag and skip messages.
const GROUP_CAPACITY: usize = 256;

/// A named message pushed to every member of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubMessage {
    /// Client-side handler name, e.g. `ReceiveOrderCreated`.
    pub target: String,
    /// Message body.
    pub payload: serde_json::Value,
}

/// Fan-out hub shared by the broadcast channel and the connection handlers.
#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    groups: Arc<DashMap<String, broadcast::Sender<HubMessage>>>,
}

impl BroadcastHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins `group`, creating it on first use.
    pub fn subscribe(&self, group: &str) -> broadcast::Receiver<HubMessage> {
        self.groups
            .entry(group.to_owned())
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .subscribe()
    }

    /// Pushes `message` to every current member of `group` and returns how
    /// many members it reached. A group without members is not an error.
    pub fn send_to_group(&self, group: &str, message: HubMessage) -> usize {
        self.groups
            .get(group)
            .map_or(0, |tx| tx.send(message).unwrap_or(0))
    }

    /// Number of current members of `group`.
    #[must_use]
    pub fn group_size(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |tx| tx.receiver_count())
    }
}
