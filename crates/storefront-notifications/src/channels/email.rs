//! Email notification channel using SMTP.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EMAIL_CHANNEL;
use crate::application::channel::DeliveryChannel;
use crate::domain::events::{OrderCreated, OrderEventKind, OrderLifecycleEvent};
use crate::error::ChannelError;

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTlsMode {
    /// Plain connection. Only for local relays.
    None,
    /// Upgrade with STARTTLS (usually port 587).
    #[default]
    StartTls,
    /// TLS from the first byte (usually port 465).
    Implicit,
}

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP server host.
    pub smtp_host: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: Option<String>,
    /// SMTP password.
    pub smtp_password: Option<String>,
    /// Session security.
    #[serde(default)]
    pub tls: SmtpTlsMode,
    /// Sender email address.
    pub from_address: String,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Connection and command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            tls: SmtpTlsMode::StartTls,
            from_address: String::new(),
            from_name: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// A composed email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,
}

/// Sends composed mail. The transport owns its connection and timeout.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends one message.
    async fn send(&self, mail: OutgoingMail) -> Result<(), ChannelError>;
}

/// SMTP transport backed by a pooled `lettre` client.
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Builds a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Transport` if the relay cannot be configured and
    /// `ChannelError::InvalidRecipient` if the sender address is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, ChannelError> {
        let builder = match config.tls {
            SmtpTlsMode::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.smtp_host,
            )),
            SmtpTlsMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            }
            SmtpTlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host),
        }
        .map_err(|e| ChannelError::Transport(format!("smtp relay setup failed: {e}")))?;

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let address: Address = config.from_address.parse().map_err(|e| {
            ChannelError::InvalidRecipient(format!("sender {}: {e}", config.from_address))
        })?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(config.from_name.clone(), address),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: OutgoingMail) -> Result<(), ChannelError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| ChannelError::InvalidRecipient(format!("{}: {e}", mail.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .multipart(MultiPart::alternative_plain_html(
                mail.text_body,
                mail.html_body,
            ))
            .map_err(|e| ChannelError::Transport(format!("message build failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ChannelError::Transport(format!("smtp send failed: {e}")))?;
        Ok(())
    }
}

/// Sends an order confirmation to the customer for created orders.
///
/// Status changes carry no recipient, so this channel reports them as
/// unsupported; configure it only for `Created`.
pub struct EmailChannel {
    transport: Arc<dyn MailTransport>,
}

impl EmailChannel {
    /// Creates a channel sending through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Composes the confirmation mail for `event`.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::UnsupportedEvent` for anything but `Created`.
    pub fn compose(&self, event: &OrderLifecycleEvent) -> Result<OutgoingMail, ChannelError> {
        match event.kind() {
            OrderEventKind::Created(created) => {
                let totals = line_totals(created)?;
                Ok(OutgoingMail {
                    to: created.recipient_email.clone(),
                    subject: build_subject(created),
                    text_body: build_body_text(event, created, &totals),
                    html_body: build_body_html(event, created, &totals),
                })
            }
            OrderEventKind::StatusChanged(_) => Err(ChannelError::UnsupportedEvent {
                channel: EMAIL_CHANNEL,
                kind: event.lifecycle_kind(),
            }),
        }
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn name(&self) -> &'static str {
        EMAIL_CHANNEL
    }

    async fn deliver(&self, event: &OrderLifecycleEvent) -> Result<(), ChannelError> {
        let mail = self.compose(event)?;
        let recipient = mail.to.clone();
        self.transport.send(mail).await?;
        debug!(order_id = %event.order_id(), recipient = %recipient, "order confirmation mailed");
        Ok(())
    }
}

fn build_subject(created: &OrderCreated) -> String {
    format!("Order confirmation {}", created.order_code)
}

fn line_totals(created: &OrderCreated) -> Result<Vec<Decimal>, ChannelError> {
    created
        .line_items
        .iter()
        .map(|item| {
            item.line_total().ok_or_else(|| {
                ChannelError::Transport(format!("line total overflows for {}", item.product_name))
            })
        })
        .collect()
}

fn build_body_text(
    event: &OrderLifecycleEvent,
    created: &OrderCreated,
    totals: &[Decimal],
) -> String {
    let mut body = format!(
        "Hello {},\n\nThank you for your order. Order {} (reference {}) was placed on {}.\n\nItems:\n",
        created.user_display_name,
        created.order_code,
        event.order_id(),
        created.order_date.format("%Y-%m-%d %H:%M UTC"),
    );
    for (item, total) in created.line_items.iter().zip(totals) {
        let _ = writeln!(
            body,
            "  - {} x {} @ {:.2} = {:.2}",
            item.quantity, item.product_name, item.unit_price, total
        );
    }
    let _ = write!(body, "\nTotal: {:.2}\n\nShipping to:\n", created.total_price);
    for line in created.shipping_address.lines() {
        let _ = writeln!(body, "  {line}");
    }
    if !created.description.trim().is_empty() {
        let _ = write!(body, "\nNote: {}\n", created.description);
    }
    body
}

fn build_body_html(
    event: &OrderLifecycleEvent,
    created: &OrderCreated,
    totals: &[Decimal],
) -> String {
    let rows: String = created
        .line_items
        .iter()
        .zip(totals)
        .map(|(item, total)| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                escape_html(&item.product_name),
                item.quantity,
                item.unit_price,
                total
            )
        })
        .collect();
    let address = created
        .shipping_address
        .lines()
        .iter()
        .map(|line| escape_html(line))
        .collect::<Vec<_>>()
        .join("<br>");
    let note = if created.description.trim().is_empty() {
        String::new()
    } else {
        format!("<p>Note: {}</p>", escape_html(&created.description))
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif;">
    <h2>Thank you for your order, {name}!</h2>
    <p>Order <strong>{code}</strong> (reference {order_id}) was placed on {date}.</p>
    <table>
        <tr><th>Product</th><th>Qty</th><th>Unit price</th><th>Total</th></tr>
        {rows}
    </table>
    <p><strong>Total: {total:.2}</strong></p>
    <p>Shipping to:<br>{address}</p>
    {note}
</body>
</html>"#,
        name = escape_html(&created.user_display_name),
        code = escape_html(&created.order_code),
        order_id = escape_html(event.order_id().as_str()),
        date = created.order_date.format("%Y-%m-%d %H:%M UTC"),
        rows = rows,
        total = created.total_price,
        address = address,
        note = note,
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
