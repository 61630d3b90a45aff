//! Integration tests for `OrderEventConsumer`: channel isolation, the
//! acknowledge/redeliver contract, and end-to-end delivery through the real
//! email and broadcast channels.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use storefront_notifications::application::channel::ChannelSet;
use storefront_notifications::application::consumer::{Acknowledgement, OrderEventConsumer};
use storefront_notifications::channels::{
    ADMINS_GROUP, BroadcastHub, ChatWebhookChannel, EmailChannel, RealtimeBroadcastChannel,
};
use storefront_notifications::domain::events::{
    LifecycleKind, ORDER_CREATED_EVENT_TYPE, ORDER_STATUS_CHANGED_EVENT_TYPE,
};
use storefront_notifications::error::ConsumeError;
use storefront_test_support::{
    FailingChannel, FailingMailer, FixedClock, PanickingChannel, RecordingChannel, RecordingMailer,
    WarnCounter, fixed_now, order_created_event, order_created_message,
    order_status_changed_event,
};
use uuid::Uuid;

fn price() -> Decimal {
    Decimal::new(14990, 2)
}

macro_rules! created_consumer {
    ($($channel:expr),* $(,)?) => {
        OrderEventConsumer::new(
            ChannelSet::builder()
                $(.on(LifecycleKind::Created, $channel))*
                .build(),
        )
    };
}

#[tokio::test]
async fn test_email_failure_does_not_suppress_broadcast() {
    // Arrange
    let warnings = WarnCounter::new();
    let _guard = warnings.install();
    let email = Arc::new(FailingChannel::new("email"));
    let broadcast = Arc::new(RecordingChannel::new("realtime-broadcast"));
    let consumer = created_consumer!(email.clone(), broadcast.clone());
    let event = order_created_event("ORD-100", "a@x.com", price());

    // Act
    let result = consumer.consume(&event).await;

    // Assert
    assert_eq!(Acknowledgement::from(&result), Acknowledgement::Acknowledge);
    let report = result.unwrap();
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures().next().unwrap().channel, "email");
    assert_eq!(email.attempts(), 1);
    assert_eq!(broadcast.call_count(), 1);
    assert_eq!(warnings.count(), 1);
}

#[tokio::test]
async fn test_all_channels_failing_still_acknowledges() {
    // Arrange
    let first = Arc::new(FailingChannel::new("email"));
    let second = Arc::new(FailingChannel::new("realtime-broadcast"));
    let consumer = created_consumer!(first.clone(), second.clone());

    // Act
    let result = consumer
        .consume(&order_created_event("ORD-100", "a@x.com", price()))
        .await;

    // Assert
    assert_eq!(Acknowledgement::from(&result), Acknowledgement::Acknowledge);
    let report = result.unwrap();
    assert_eq!(report.failure_count(), 2);
    assert_eq!(first.attempts(), 1);
    assert_eq!(second.attempts(), 1);
}

#[tokio::test]
async fn test_panicking_channel_is_isolated() {
    // Arrange
    let broadcast = Arc::new(RecordingChannel::new("realtime-broadcast"));
    let consumer = created_consumer!(
        Arc::new(PanickingChannel::new("email")),
        broadcast.clone(),
    );

    // Act
    let report = consumer
        .consume(&order_created_event("ORD-100", "a@x.com", price()))
        .await
        .unwrap();

    // Assert
    assert_eq!(report.failure_count(), 1);
    assert!(
        report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("email channel exploded")
    );
    assert_eq!(broadcast.call_count(), 1);
}

#[tokio::test]
async fn test_malformed_message_redelivers_without_attempting_channels() {
    // Arrange
    let channel = Arc::new(RecordingChannel::new("email"));
    let consumer = created_consumer!(channel.clone());
    let mut payload = order_created_message("ORD-100", "a@x.com", price());
    payload.as_object_mut().unwrap().remove("order_id");

    // Act
    let result = consumer
        .consume_message(ORDER_CREATED_EVENT_TYPE, &payload)
        .await;

    // Assert
    assert_eq!(Acknowledgement::from(&result), Acknowledgement::Redeliver);
    assert!(matches!(result, Err(ConsumeError::Malformed(_))));
    assert_eq!(channel.call_count(), 0);
}

#[tokio::test]
async fn test_blank_order_id_redelivers_without_attempting_channels() {
    // Arrange
    let channel = Arc::new(RecordingChannel::new("email"));
    let consumer = created_consumer!(channel.clone());
    let mut payload = order_created_message("ORD-100", "a@x.com", price());
    payload["order_id"] = json!("");

    // Act
    let result = consumer
        .consume_message(ORDER_CREATED_EVENT_TYPE, &payload)
        .await;

    // Assert
    assert!(matches!(result, Err(ConsumeError::InvalidEvent(_))));
    assert_eq!(channel.call_count(), 0);
}

#[tokio::test]
async fn test_redelivered_event_is_attempted_again_independently() {
    // Arrange
    let channel = Arc::new(RecordingChannel::new("email"));
    let consumer = created_consumer!(channel.clone());
    let event = order_created_event("ORD-100", "a@x.com", price());

    // Act
    let first = consumer.consume(&event).await.unwrap();
    let second = consumer.consume(&event).await.unwrap();

    // Assert
    assert_eq!(channel.call_count(), 2);
    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(first.event_id, second.event_id);
    assert!(channel.delivered().iter().all(|e| e == &event));
}

#[tokio::test]
async fn test_channels_are_attempted_in_configured_order() {
    let consumer = created_consumer!(
        Arc::new(RecordingChannel::new("email")),
        Arc::new(FailingChannel::new("realtime-broadcast")),
        Arc::new(ChatWebhookChannel::new()),
    );

    let report = consumer
        .consume(&order_created_event("ORD-100", "a@x.com", price()))
        .await
        .unwrap();

    let names: Vec<_> = report.outcomes.iter().map(|o| o.channel).collect();
    assert_eq!(names, vec!["email", "realtime-broadcast", "chat-webhook"]);
    assert!(report.outcomes[0].success);
    assert!(
        report.outcomes[2]
            .error
            .as_deref()
            .unwrap()
            .contains("not supported")
    );
}

#[tokio::test]
async fn test_kind_without_channels_acknowledges_with_no_outcomes() {
    let consumer = created_consumer!(Arc::new(RecordingChannel::new("email")));

    let report = consumer
        .consume(&order_status_changed_event("ORD-100", "Shipped", "Kargoya verildi"))
        .await
        .unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(report.kind, LifecycleKind::StatusChanged);
}

#[tokio::test]
async fn test_order_created_reaches_customer_mail_and_admin_broadcast() {
    // Arrange
    let mailer = Arc::new(RecordingMailer::new());
    let hub = BroadcastHub::new();
    let mut admins = hub.subscribe(ADMINS_GROUP);
    let consumer = created_consumer!(
        Arc::new(EmailChannel::new(mailer.clone())),
        Arc::new(RealtimeBroadcastChannel::new(
            hub.clone(),
            Arc::new(FixedClock(fixed_now())),
        )),
    );
    let payload = order_created_message("ORD-100", "a@x.com", price());

    // Act
    let report = consumer
        .consume_message(ORDER_CREATED_EVENT_TYPE, &payload)
        .await
        .unwrap();

    // Assert
    assert!(report.all_delivered());
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@x.com");
    assert!(sent[0].text_body.contains("ORD-100"));
    assert!(sent[0].text_body.contains("149.90"));

    let pushed = admins.recv().await.unwrap();
    assert_eq!(pushed.target, "ReceiveOrderCreated");
    assert_eq!(pushed.payload["Type"], "OrderCreated");
    assert_eq!(pushed.payload["OrderId"], "ORD-100");
    assert!(pushed.payload.get("Status").is_none());
}

#[tokio::test]
async fn test_status_change_broadcasts_status_and_skips_email() {
    // Arrange
    let hub = BroadcastHub::new();
    let mut admins = hub.subscribe(ADMINS_GROUP);
    let email = Arc::new(RecordingChannel::new("email"));
    let set = ChannelSet::builder()
        .on(LifecycleKind::Created, email.clone())
        .on(
            LifecycleKind::StatusChanged,
            Arc::new(RealtimeBroadcastChannel::new(
                hub.clone(),
                Arc::new(FixedClock(fixed_now())),
            )),
        )
        .build();
    let consumer = OrderEventConsumer::new(set);
    let event = order_status_changed_event("ORD-100", "Shipped", "Kargoya verildi");

    // Act
    let report = consumer
        .consume_message(ORDER_STATUS_CHANGED_EVENT_TYPE, &event.to_message())
        .await
        .unwrap();

    // Assert
    assert!(report.all_delivered());
    assert_eq!(email.call_count(), 0);
    let pushed = admins.recv().await.unwrap();
    assert_eq!(pushed.target, "ReceiveOrderStatusUpdate");
    assert_eq!(pushed.payload["Status"], "Shipped");
    assert_eq!(pushed.payload["Message"], "Kargoya verildi");
}

#[tokio::test]
async fn test_mail_relay_outage_is_recorded_as_email_failure() {
    let consumer = created_consumer!(Arc::new(EmailChannel::new(Arc::new(FailingMailer))));

    let report = consumer
        .consume(&order_created_event("ORD-100", "a@x.com", price()))
        .await
        .unwrap();

    assert_eq!(report.failure_count(), 1);
    assert!(
        report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("smtp relay unreachable")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_events_share_one_consumer() {
    // Arrange
    let channel = Arc::new(RecordingChannel::new("email"));
    let consumer = created_consumer!(channel.clone());

    // Act
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let consumer = consumer.clone();
            tokio::spawn(async move {
                let event = order_created_event(&format!("ORD-{i}"), "a@x.com", price());
                consumer.consume(&event).await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    // Assert
    assert_eq!(channel.call_count(), 16);
    let mut ids: Vec<_> = channel
        .delivered()
        .iter()
        .map(|e| e.order_id().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

#[tokio::test]
async fn test_unknown_event_type_is_redelivered() {
    let consumer = created_consumer!();

    let result = consumer
        .consume_message("OrderArchived", &json!({ "event_id": Uuid::new_v4() }))
        .await;

    assert_eq!(Acknowledgement::from(&result), Acknowledgement::Redeliver);
}
