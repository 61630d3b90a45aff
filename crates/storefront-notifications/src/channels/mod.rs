//! Notification channels.
//!
//! This module provides the delivery mechanisms for order events:
//! - Email (SMTP) order confirmations to the customer
//! - Realtime broadcast to the administrators group
//! - Chat webhook (placeholder, always reports "not supported")

mod broadcast;
mod chat;
mod email;
mod hub;

pub use broadcast::{
    AdminNotification, ORDER_CREATED_TARGET, ORDER_STATUS_UPDATE_TARGET, RealtimeBroadcastChannel,
};
pub use chat::ChatWebhookChannel;
pub use email::{
    EmailChannel, EmailConfig, MailTransport, OutgoingMail, SmtpMailTransport, SmtpTlsMode,
};
pub use hub::{ADMINS_GROUP, BroadcastHub, HubMessage};

/// Channel name of [`EmailChannel`].
pub const EMAIL_CHANNEL: &str = "email";

/// Channel name of [`RealtimeBroadcastChannel`].
pub const BROADCAST_CHANNEL: &str = "realtime-broadcast";

/// Channel name of [`ChatWebhookChannel`].
pub const CHAT_WEBHOOK_CHANNEL: &str = "chat-webhook";
