//! Test mail transports: mock `MailTransport` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use storefront_notifications::channels::{MailTransport, OutgoingMail};
use storefront_notifications::error::ChannelError;

/// A mail transport that records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    /// Create an empty recording mailer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all sent mail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// A mail transport whose relay is always unreachable.
#[derive(Debug)]
pub struct FailingMailer;

#[async_trait]
impl MailTransport for FailingMailer {
    async fn send(&self, _mail: OutgoingMail) -> Result<(), ChannelError> {
        Err(ChannelError::Transport("smtp relay unreachable".into()))
    }
}
