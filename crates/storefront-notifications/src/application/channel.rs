//! Delivery channel abstraction and per-kind channel sets.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, warn};

use storefront_core::event::DomainEvent;

use crate::domain::events::{LifecycleKind, OrderLifecycleEvent};
use crate::domain::outcome::DeliveryOutcome;
use crate::error::ChannelError;

/// One mechanism for turning an event into a user-visible notification.
///
/// Implementations own their I/O resources and their timeout/retry policy.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Stable channel name used in logs and outcomes.
    fn name(&self) -> &'static str;

    /// Attempts one delivery of `event`.
    async fn deliver(&self, event: &OrderLifecycleEvent) -> Result<(), ChannelError>;
}

/// Attempts delivery through `channel` and captures the result.
///
/// Neither an error nor a panic raised by the channel propagates past this
/// call; both become a failed outcome that is logged with the order id and
/// channel name.
pub async fn attempt_delivery(
    channel: &dyn DeliveryChannel,
    event: &OrderLifecycleEvent,
) -> DeliveryOutcome {
    let name = channel.name();
    let result = match AssertUnwindSafe(channel.deliver(event)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(ChannelError::Panicked(panic_message(panic.as_ref()))),
    };

    match result {
        Ok(()) => {
            debug!(order_id = %event.order_id(), channel = name, "notification delivered");
            DeliveryOutcome::delivered(name)
        }
        Err(err) => {
            warn!(
                order_id = %event.order_id(),
                event_id = %event.metadata().event_id,
                channel = name,
                error = %err,
                "notification delivery failed"
            );
            DeliveryOutcome::failed(name, err.to_string())
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// The fixed, ordered list of channels configured for each event kind.
#[derive(Clone, Default)]
pub struct ChannelSet {
    created: Vec<Arc<dyn DeliveryChannel>>,
    status_changed: Vec<Arc<dyn DeliveryChannel>>,
}

impl ChannelSet {
    /// Starts an empty set.
    #[must_use]
    pub fn builder() -> ChannelSetBuilder {
        ChannelSetBuilder::default()
    }

    /// Channels for `kind`, in attempt order.
    #[must_use]
    pub fn for_kind(&self, kind: LifecycleKind) -> &[Arc<dyn DeliveryChannel>] {
        match kind {
            LifecycleKind::Created => &self.created,
            LifecycleKind::StatusChanged => &self.status_changed,
        }
    }

    /// Channel names for `kind`, in attempt order.
    #[must_use]
    pub fn names(&self, kind: LifecycleKind) -> Vec<&'static str> {
        self.for_kind(kind).iter().map(|c| c.name()).collect()
    }
}

impl std::fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSet")
            .field("created", &self.names(LifecycleKind::Created))
            .field("status_changed", &self.names(LifecycleKind::StatusChanged))
            .finish()
    }
}

/// Builder for [`ChannelSet`].
#[derive(Default)]
pub struct ChannelSetBuilder {
    set: ChannelSet,
}

impl ChannelSetBuilder {
    /// Appends `channel` to the list for `kind`.
    #[must_use]
    pub fn on(mut self, kind: LifecycleKind, channel: Arc<dyn DeliveryChannel>) -> Self {
        match kind {
            LifecycleKind::Created => self.set.created.push(channel),
            LifecycleKind::StatusChanged => self.set.status_changed.push(channel),
        }
        self
    }

    /// Finishes the set.
    #[must_use]
    pub fn build(self) -> ChannelSet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::events::{OrderId, OrderStatusChanged};

    struct Named(&'static str);

    #[async_trait]
    impl DeliveryChannel for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn deliver(&self, _event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
            match self.0 {
                "fails" => Err(ChannelError::Transport("connection refused".into())),
                "panics" => panic!("push context disposed"),
                _ => Ok(()),
            }
        }
    }

    fn event() -> OrderLifecycleEvent {
        OrderLifecycleEvent::status_changed(
            OrderId::new("ORD-100"),
            OrderStatusChanged {
                status: "Shipped".to_owned(),
                message: "Kargoya verildi".to_owned(),
            },
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_builder_keeps_insertion_order_per_kind() {
        let set = ChannelSet::builder()
            .on(LifecycleKind::Created, Arc::new(Named("email")))
            .on(LifecycleKind::Created, Arc::new(Named("realtime-broadcast")))
            .on(LifecycleKind::StatusChanged, Arc::new(Named("realtime-broadcast")))
            .build();

        assert_eq!(
            set.names(LifecycleKind::Created),
            vec!["email", "realtime-broadcast"]
        );
        assert_eq!(
            set.names(LifecycleKind::StatusChanged),
            vec!["realtime-broadcast"]
        );
    }

    #[test]
    fn test_empty_set_has_no_channels() {
        let set = ChannelSet::builder().build();

        assert!(set.for_kind(LifecycleKind::Created).is_empty());
    }

    #[tokio::test]
    async fn test_attempt_delivery_reports_success() {
        let outcome = attempt_delivery(&Named("ok"), &event()).await;

        assert_eq!(outcome, DeliveryOutcome::delivered("ok"));
    }

    #[tokio::test]
    async fn test_attempt_delivery_captures_error() {
        let outcome = attempt_delivery(&Named("fails"), &event()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.channel, "fails");
        assert!(outcome.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_attempt_delivery_captures_panic() {
        let outcome = attempt_delivery(&Named("panics"), &event()).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("push context disposed"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_attempt_delivery_logs_one_warning_per_failure() {
        let warnings = storefront_test_support::WarnCounter::new();
        let _guard = warnings.install();

        attempt_delivery(&Named("ok"), &event()).await;
        attempt_delivery(&Named("fails"), &event()).await;

        assert_eq!(warnings.count(), 1);
    }
}
