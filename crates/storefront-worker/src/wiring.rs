//! Builds the channel set from configuration.

use std::sync::Arc;

use storefront_core::clock::Clock;
use storefront_notifications::application::channel::{ChannelSet, DeliveryChannel};
use storefront_notifications::channels::{
    BroadcastHub, ChatWebhookChannel, EmailChannel, MailTransport, RealtimeBroadcastChannel,
    SmtpMailTransport,
};
use storefront_notifications::domain::events::LifecycleKind;

use crate::config::{ChannelKind, WorkerConfig};
use crate::error::AppError;

/// Opens the SMTP transport when email is configured.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `AppError::Config` if the relay or sender address is invalid.
pub fn mail_transport(config: &WorkerConfig) -> Result<Option<Arc<dyn MailTransport>>, AppError> {
    config
        .email
        .as_ref()
        .map(|email| {
            SmtpMailTransport::new(email)
                .map(|t| Arc::new(t) as Arc<dyn MailTransport>)
                .map_err(|e| AppError::Config(format!("email channel: {e}")))
        })
        .transpose()
}

/// Instantiates the configured channels, one instance per channel kind,
/// shared between the event kinds that list it.
///
/// # Errors
///
/// Returns `AppError::Config` if `email` is listed but `mail` is `None`.
pub fn build_channel_set(
    config: &WorkerConfig,
    hub: &BroadcastHub,
    clock: Arc<dyn Clock>,
    mail: Option<Arc<dyn MailTransport>>,
) -> Result<ChannelSet, AppError> {
    let email: Option<Arc<dyn DeliveryChannel>> =
        mail.map(|transport| Arc::new(EmailChannel::new(transport)) as Arc<dyn DeliveryChannel>);
    let broadcast: Arc<dyn DeliveryChannel> =
        Arc::new(RealtimeBroadcastChannel::new(hub.clone(), clock));
    let chat: Arc<dyn DeliveryChannel> = Arc::new(ChatWebhookChannel::new());

    let resolve = |kind: ChannelKind| -> Result<Arc<dyn DeliveryChannel>, AppError> {
        match kind {
            ChannelKind::Email => email.clone().ok_or_else(|| {
                AppError::Config("the email channel requires SMTP_HOST and SMTP_FROM".into())
            }),
            ChannelKind::Broadcast => Ok(Arc::clone(&broadcast)),
            ChannelKind::ChatWebhook => Ok(Arc::clone(&chat)),
        }
    };

    let mut builder = ChannelSet::builder();
    for (lifecycle, kinds) in [
        (LifecycleKind::Created, &config.order_created_channels),
        (
            LifecycleKind::StatusChanged,
            &config.order_status_changed_channels,
        ),
    ] {
        for kind in kinds {
            builder = builder.on(lifecycle, resolve(*kind)?);
        }
    }
    let channels = builder.build();

    tracing::info!(
        created = ?channels.names(LifecycleKind::Created),
        status_changed = ?channels.names(LifecycleKind::StatusChanged),
        "delivery channels configured"
    );
    Ok(channels)
}
