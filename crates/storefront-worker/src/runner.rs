//! Broker poll loops.
//!
//! Each loop claims one message at a time, hands it to the shared
//! [`OrderEventConsumer`], and reports the consumer's decision back to the
//! queue: an acknowledged message is removed, anything else is redelivered
//! after the retry policy's delay until the queue dead-letters it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use storefront_core::error::DomainError;
use storefront_core::queue::{MessageQueue, Redelivery};
use storefront_notifications::application::consumer::{Acknowledgement, OrderEventConsumer};
use storefront_notifications::error::ConsumeError;

use crate::config::WorkerConfig;
use crate::retry::RetryPolicy;

/// What a single poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    /// The queue had no visible message.
    Idle,
    /// The message was consumed and removed.
    Acknowledged,
    /// The message could not be consumed and will be delivered again.
    Redelivered,
    /// The message could not be consumed and its attempts are exhausted.
    DeadLettered,
}

/// Poll loop settings.
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// Number of independent loops.
    pub concurrency: usize,
    /// Sleep after an empty poll or a queue error.
    pub poll_interval: Duration,
    /// Visibility timeout passed to `receive`.
    pub visibility_timeout: Duration,
    /// Backoff for redelivered messages.
    pub retry: RetryPolicy,
}

impl From<&WorkerConfig> for RunnerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            poll_interval: config.poll_interval,
            visibility_timeout: config.visibility_timeout,
            retry: config.retry,
        }
    }
}

/// Claims and processes at most one message.
///
/// # Errors
///
/// Returns `DomainError` if the queue itself fails. The claimed message then
/// stays hidden until its visibility timeout lapses and is handed out again.
pub async fn process_next(
    queue: &dyn MessageQueue,
    consumer: &OrderEventConsumer,
    policy: &RetryPolicy,
    visibility_timeout: Duration,
) -> Result<Processed, DomainError> {
    let Some(message) = queue.receive(visibility_timeout).await? else {
        return Ok(Processed::Idle);
    };

    let result = AssertUnwindSafe(consumer.consume_message(&message.event_type, &message.payload))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(ConsumeError::Internal("consumer panicked".into())));

    match Acknowledgement::from(&result) {
        Acknowledgement::Acknowledge => {
            queue.acknowledge(message.message_id).await?;
            info!(
                message_id = %message.message_id,
                event_type = %message.event_type,
                attempts = message.attempts,
                "message acknowledged"
            );
            Ok(Processed::Acknowledged)
        }
        Acknowledgement::Redeliver => {
            let reason = result.err().map(|e| e.to_string()).unwrap_or_default();
            let delay = policy.delay_for(message.attempts);
            match queue
                .redeliver(message.message_id, delay, &reason)
                .await?
            {
                Redelivery::Scheduled { available_at } => {
                    warn!(
                        message_id = %message.message_id,
                        event_type = %message.event_type,
                        attempts = message.attempts,
                        %available_at,
                        error = %reason,
                        "message redelivered"
                    );
                    Ok(Processed::Redelivered)
                }
                Redelivery::DeadLettered => {
                    error!(
                        message_id = %message.message_id,
                        event_type = %message.event_type,
                        attempts = message.attempts,
                        error = %reason,
                        "message dead-lettered"
                    );
                    Ok(Processed::DeadLettered)
                }
            }
        }
    }
}

/// Spawns `settings.concurrency` poll loops sharing `consumer`.
///
/// Loops finish the message in hand and exit once `shutdown` is cancelled.
#[must_use]
pub fn run_workers(
    queue: Arc<dyn MessageQueue>,
    consumer: OrderEventConsumer,
    settings: RunnerSettings,
    shutdown: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..settings.concurrency.max(1))
        .map(|worker| {
            tokio::spawn(poll_loop(
                worker,
                Arc::clone(&queue),
                consumer.clone(),
                settings,
                shutdown.clone(),
            ))
        })
        .collect()
}

async fn poll_loop(
    worker: usize,
    queue: Arc<dyn MessageQueue>,
    consumer: OrderEventConsumer,
    settings: RunnerSettings,
    shutdown: CancellationToken,
) {
    info!(worker, "notification worker started");
    while !shutdown.is_cancelled() {
        let idle = match process_next(
            queue.as_ref(),
            &consumer,
            &settings.retry,
            settings.visibility_timeout,
        )
        .await
        {
            Ok(Processed::Idle) => true,
            Ok(_) => false,
            Err(err) => {
                error!(worker, error = %err, "queue operation failed");
                true
            }
        };

        if idle {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(settings.poll_interval) => {}
            }
        }
    }
    info!(worker, "notification worker stopped");
}
