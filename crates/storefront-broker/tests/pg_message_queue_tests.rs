//! Integration tests for `PgMessageQueue`.

use std::time::Duration;

use serde_json::json;
use sqlx::PgPool;
use storefront_broker::pg_message_queue::PgMessageQueue;
use storefront_core::error::DomainError;
use storefront_core::queue::{MessageQueue, Redelivery};
use uuid::Uuid;

const VISIBILITY: Duration = Duration::from_secs(60);

// --- publish + receive ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_receive_returns_none_for_empty_queue(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);

    let message = queue.receive(VISIBILITY).await.unwrap();

    assert!(message.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_published_message_is_received_with_first_attempt(pool: PgPool) {
    // Arrange
    let queue = PgMessageQueue::new(pool);
    let payload = json!({"order_id": "ORD-100"});
    let message_id = queue.publish("OrderCreated", payload.clone()).await.unwrap();

    // Act
    let message = queue.receive(VISIBILITY).await.unwrap().unwrap();

    // Assert
    assert_eq!(message.message_id, message_id);
    assert_eq!(message.event_type, "OrderCreated");
    assert_eq!(message.payload, payload);
    assert_eq!(message.attempts, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_received_message_is_hidden_until_visibility_lapses(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);
    queue.publish("OrderCreated", json!({})).await.unwrap();

    let first = queue.receive(VISIBILITY).await.unwrap();
    let second = queue.receive(VISIBILITY).await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_lapsed_claim_is_handed_out_again(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);
    let message_id = queue.publish("OrderCreated", json!({})).await.unwrap();

    queue.receive(Duration::ZERO).await.unwrap().unwrap();
    let again = queue.receive(VISIBILITY).await.unwrap().unwrap();

    assert_eq!(again.message_id, message_id);
    assert_eq!(again.attempts, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_messages_are_received_oldest_first(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);
    let first = queue.publish("OrderCreated", json!({"n": 1})).await.unwrap();
    let second = queue.publish("OrderCreated", json!({"n": 2})).await.unwrap();

    let a = queue.receive(VISIBILITY).await.unwrap().unwrap();
    let b = queue.receive(VISIBILITY).await.unwrap().unwrap();

    assert_eq!(a.message_id, first);
    assert_eq!(b.message_id, second);
}

// --- acknowledge ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_acknowledged_message_is_removed(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);
    queue.publish("OrderCreated", json!({})).await.unwrap();
    let message = queue.receive(Duration::ZERO).await.unwrap().unwrap();

    queue.acknowledge(message.message_id).await.unwrap();

    assert!(queue.receive(VISIBILITY).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_acknowledge_unknown_message_returns_not_found(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);

    let result = queue.acknowledge(Uuid::new_v4()).await;

    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

// --- redeliver ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_redeliver_schedules_message_after_delay(pool: PgPool) {
    // Arrange
    let queue = PgMessageQueue::new(pool);
    queue.publish("OrderCreated", json!({})).await.unwrap();
    let message = queue.receive(VISIBILITY).await.unwrap().unwrap();

    // Act
    let outcome = queue
        .redeliver(message.message_id, Duration::from_secs(30), "malformed")
        .await
        .unwrap();

    // Assert
    assert!(matches!(outcome, Redelivery::Scheduled { .. }));
    assert!(queue.receive(VISIBILITY).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_redeliver_with_zero_delay_is_immediately_visible(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);
    let message_id = queue.publish("OrderCreated", json!({})).await.unwrap();
    queue.receive(VISIBILITY).await.unwrap().unwrap();

    queue
        .redeliver(message_id, Duration::ZERO, "retry")
        .await
        .unwrap();
    let again = queue.receive(VISIBILITY).await.unwrap().unwrap();

    assert_eq!(again.message_id, message_id);
    assert_eq!(again.attempts, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_message_is_dead_lettered_after_max_attempts(pool: PgPool) {
    // Arrange
    let queue = PgMessageQueue::with_max_attempts(pool, 2);
    let message_id = queue.publish("OrderCreated", json!({})).await.unwrap();

    // Act
    queue.receive(VISIBILITY).await.unwrap().unwrap();
    let first = queue
        .redeliver(message_id, Duration::ZERO, "bad payload")
        .await
        .unwrap();
    queue.receive(VISIBILITY).await.unwrap().unwrap();
    let second = queue
        .redeliver(message_id, Duration::ZERO, "bad payload")
        .await
        .unwrap();

    // Assert
    assert!(matches!(first, Redelivery::Scheduled { .. }));
    assert_eq!(second, Redelivery::DeadLettered);
    assert!(queue.receive(VISIBILITY).await.unwrap().is_none());
    assert_eq!(queue.dead_letter_count().await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_lapsed_claim_on_final_attempt_is_dead_lettered(pool: PgPool) {
    // Arrange
    let queue = PgMessageQueue::with_max_attempts(pool, 2);
    queue.publish("OrderCreated", json!({})).await.unwrap();
    queue.receive(Duration::ZERO).await.unwrap().unwrap();
    queue.receive(Duration::ZERO).await.unwrap().unwrap();

    // Act
    let claimed = queue.receive(VISIBILITY).await.unwrap();

    // Assert
    assert!(claimed.is_none());
    assert_eq!(queue.dead_letter_count().await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_redeliver_unknown_message_returns_not_found(pool: PgPool) {
    let queue = PgMessageQueue::new(pool);

    let result = queue
        .redeliver(Uuid::new_v4(), Duration::ZERO, "gone")
        .await;

    assert!(matches!(result, Err(DomainError::NotFound(_))));
}
