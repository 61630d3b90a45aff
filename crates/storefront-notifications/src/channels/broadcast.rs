//! Realtime broadcast channel: pushes order events to connected administrators.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::clock::Clock;
use tracing::debug;

use super::BROADCAST_CHANNEL;
use super::hub::{ADMINS_GROUP, BroadcastHub, HubMessage};
use crate::application::channel::DeliveryChannel;
use crate::domain::events::{OrderEventKind, OrderLifecycleEvent};
use crate::error::ChannelError;

/// Client handler invoked for new orders.
pub const ORDER_CREATED_TARGET: &str = "ReceiveOrderCreated";

/// Client handler invoked for status updates.
pub const ORDER_STATUS_UPDATE_TARGET: &str = "ReceiveOrderStatusUpdate";

/// Body pushed to the administrators group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdminNotification {
    /// Event type, e.g. `OrderCreated`.
    #[serde(rename = "Type")]
    pub kind: String,
    /// The order concerned.
    pub order_id: String,
    /// New status, for status updates only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable summary.
    pub message: String,
    /// When the notification was pushed.
    pub timestamp: DateTime<Utc>,
}

/// Pushes a named message to the `Admins` group of a [`BroadcastHub`].
pub struct RealtimeBroadcastChannel {
    hub: BroadcastHub,
    clock: Arc<dyn Clock>,
}

impl RealtimeBroadcastChannel {
    /// Creates a channel publishing into `hub`.
    #[must_use]
    pub fn new(hub: BroadcastHub, clock: Arc<dyn Clock>) -> Self {
        Self { hub, clock }
    }

    /// Builds the target name and body for `event`.
    #[must_use]
    pub fn build_notification(&self, event: &OrderLifecycleEvent) -> (&'static str, AdminNotification) {
        let order_id = event.order_id().to_string();
        let timestamp = self.clock.now();
        match event.kind() {
            OrderEventKind::Created(created) => (
                ORDER_CREATED_TARGET,
                AdminNotification {
                    kind: event.lifecycle_kind().event_type().to_owned(),
                    message: format!(
                        "New order {} from {} ({:.2})",
                        created.order_code, created.user_display_name, created.total_price
                    ),
                    order_id,
                    status: None,
                    timestamp,
                },
            ),
            OrderEventKind::StatusChanged(changed) => (
                ORDER_STATUS_UPDATE_TARGET,
                AdminNotification {
                    kind: event.lifecycle_kind().event_type().to_owned(),
                    order_id,
                    status: Some(changed.status.clone()),
                    message: changed.message.clone(),
                    timestamp,
                },
            ),
        }
    }
}

#[async_trait]
impl DeliveryChannel for RealtimeBroadcastChannel {
    fn name(&self) -> &'static str {
        BROADCAST_CHANNEL
    }

    async fn deliver(&self, event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
        let (target, notification) = self.build_notification(event);
        let payload = serde_json::to_value(&notification)
            .map_err(|e| ChannelError::Transport(format!("payload encoding failed: {e}")))?;

        let reached = self.hub.send_to_group(
            ADMINS_GROUP,
            HubMessage {
                target: target.to_owned(),
                payload,
            },
        );
        debug!(
            order_id = %event.order_id(),
            target,
            reached,
            "admin broadcast pushed"
        );
        Ok(())
    }
}
