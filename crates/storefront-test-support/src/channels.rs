//! Test channels: mock `DeliveryChannel` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use storefront_notifications::application::channel::DeliveryChannel;
use storefront_notifications::domain::events::OrderLifecycleEvent;
use storefront_notifications::error::ChannelError;

/// A channel that records every event it is asked to deliver and always
/// succeeds.
#[derive(Debug)]
pub struct RecordingChannel {
    name: &'static str,
    delivered: Mutex<Vec<OrderLifecycleEvent>>,
}

impl RecordingChannel {
    /// Create a recording channel reporting `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all delivered events, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn delivered(&self) -> Vec<OrderLifecycleEvent> {
        self.delivered.lock().unwrap().clone()
    }

    /// Number of deliveries so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A channel that counts attempts and always fails with a transport error.
/// Useful for testing failure isolation.
#[derive(Debug)]
pub struct FailingChannel {
    name: &'static str,
    attempts: Mutex<usize>,
}

impl FailingChannel {
    /// Create a failing channel reporting `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attempts: Mutex::new(0),
        }
    }

    /// Number of attempts so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl DeliveryChannel for FailingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, _event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
        *self.attempts.lock().unwrap() += 1;
        Err(ChannelError::Transport("connection refused".into()))
    }
}

/// A channel that panics on every delivery.
#[derive(Debug)]
pub struct PanickingChannel {
    name: &'static str,
}

impl PanickingChannel {
    /// Create a panicking channel reporting `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl DeliveryChannel for PanickingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, _event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
        panic!("{} channel exploded", self.name)
    }
}
