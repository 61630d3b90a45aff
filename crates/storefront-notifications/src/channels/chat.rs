//! Chat webhook channel.
//!
//! Reserved for posting order events into a team chat. There is no
//! delivery implementation yet: every attempt reports `NotSupported`, which
//! the consumer records as a failed outcome like any other channel failure.

use async_trait::async_trait;

use super::CHAT_WEBHOOK_CHANNEL;
use crate::application::channel::DeliveryChannel;
use crate::domain::events::OrderLifecycleEvent;
use crate::error::ChannelError;

/// Placeholder chat webhook channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatWebhookChannel;

impl ChatWebhookChannel {
    /// Creates the channel.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeliveryChannel for ChatWebhookChannel {
    fn name(&self) -> &'static str {
        CHAT_WEBHOOK_CHANNEL
    }

    async fn deliver(&self, _event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
        Err(ChannelError::NotSupported(CHAT_WEBHOOK_CHANNEL))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::events::{OrderId, OrderStatusChanged};

    #[tokio::test]
    async fn test_every_delivery_is_not_supported() {
        let event = OrderLifecycleEvent::status_changed(
            OrderId::new("ORD-100"),
            OrderStatusChanged {
                status: "Delivered".to_owned(),
                message: "Teslim edildi".to_owned(),
            },
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        )
        .unwrap();

        let result = ChatWebhookChannel::new().deliver(&event).await;

        assert!(matches!(
            result,
            Err(ChannelError::NotSupported("chat-webhook"))
        ));
    }
}
