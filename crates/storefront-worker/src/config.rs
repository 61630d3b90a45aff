//! Worker configuration read from the environment.

use std::str::FromStr;
use std::time::Duration;

use storefront_notifications::channels::{EmailConfig, SmtpTlsMode};

use crate::error::AppError;
use crate::retry::RetryPolicy;

/// A delivery channel that can be named in a channel list variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Order confirmation mail to the customer.
    Email,
    /// Realtime push to connected administrators.
    Broadcast,
    /// Chat webhook placeholder.
    ChatWebhook,
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "broadcast" | "realtime-broadcast" => Ok(Self::Broadcast),
            "chat-webhook" | "chat" => Ok(Self::ChatWebhook),
            other => Err(format!("unknown delivery channel `{other}`")),
        }
    }
}

/// Everything the worker binary needs to start.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Number of independent poll loops.
    pub concurrency: usize,
    /// Sleep between polls of an empty queue.
    pub poll_interval: Duration,
    /// How long a received message stays hidden from other workers.
    pub visibility_timeout: Duration,
    /// Deliveries before a message is dead-lettered.
    pub max_delivery_attempts: i32,
    /// Backoff for redelivered messages.
    pub retry: RetryPolicy,
    /// SMTP settings, when `SMTP_HOST` and `SMTP_FROM` are set.
    pub email: Option<EmailConfig>,
    /// Channels driven for `OrderCreated`, in order.
    pub order_created_channels: Vec<ChannelKind>,
    /// Channels driven for `OrderStatusChanged`, in order.
    pub order_status_changed_channels: Vec<ChannelKind>,
}

impl WorkerConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing, a number does
    /// not parse, a channel name is unknown, or `email` is selected without
    /// SMTP settings.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;

        let concurrency: usize = parse_or(&lookup, "WORKER_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(AppError::Config(
                "WORKER_CONCURRENCY must be at least 1".into(),
            ));
        }
        let max_delivery_attempts: i32 = parse_or(&lookup, "MAX_DELIVERY_ATTEMPTS", 5)?;
        if max_delivery_attempts < 1 {
            return Err(AppError::Config(
                "MAX_DELIVERY_ATTEMPTS must be at least 1".into(),
            ));
        }

        let email = email_config(&lookup)?;
        let order_created_channels =
            channel_list(&lookup, "ORDER_CREATED_CHANNELS", "email,broadcast")?;
        let order_status_changed_channels =
            channel_list(&lookup, "ORDER_STATUS_CHANGED_CHANNELS", "broadcast")?;

        let wants_email = order_created_channels
            .iter()
            .chain(&order_status_changed_channels)
            .any(|c| *c == ChannelKind::Email);
        if wants_email && email.is_none() {
            return Err(AppError::Config(
                "the email channel requires SMTP_HOST and SMTP_FROM".into(),
            ));
        }

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            concurrency,
            poll_interval: Duration::from_millis(parse_or(&lookup, "POLL_INTERVAL_MS", 500)?),
            visibility_timeout: Duration::from_secs(parse_or(
                &lookup,
                "VISIBILITY_TIMEOUT_SECS",
                60,
            )?),
            max_delivery_attempts,
            retry: RetryPolicy {
                initial_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "RETRY_INITIAL_DELAY_MS",
                    1000,
                )?),
                max_delay: Duration::from_millis(parse_or(&lookup, "RETRY_MAX_DELAY_MS", 60_000)?),
                jitter: true,
            },
            email,
            order_created_channels,
            order_status_changed_channels,
        })
    }

    /// `host:port` for the HTTP listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
    }
}

fn channel_list<F>(lookup: &F, key: &str, default: &str) -> Result<Vec<ChannelKind>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    let mut kinds = Vec::new();
    for name in raw.split(',').filter(|n| !n.trim().is_empty()) {
        let kind = name
            .parse::<ChannelKind>()
            .map_err(|e| AppError::Config(format!("{key}: {e}")))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn email_config<F>(lookup: &F) -> Result<Option<EmailConfig>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let (Some(smtp_host), Some(from_address)) = (lookup("SMTP_HOST"), lookup("SMTP_FROM")) else {
        return Ok(None);
    };

    let tls = match lookup("SMTP_TLS").as_deref().map(str::trim) {
        None | Some("starttls") => SmtpTlsMode::StartTls,
        Some("tls") => SmtpTlsMode::Implicit,
        Some("none") => SmtpTlsMode::None,
        Some(other) => {
            return Err(AppError::Config(format!(
                "SMTP_TLS must be starttls, tls, or none, got `{other}`"
            )));
        }
    };

    Ok(Some(EmailConfig {
        smtp_host,
        smtp_port: parse_or(lookup, "SMTP_PORT", 587)?,
        smtp_username: lookup("SMTP_USERNAME"),
        smtp_password: lookup("SMTP_PASSWORD"),
        tls,
        from_address,
        from_name: lookup("SMTP_FROM_NAME"),
        timeout_secs: parse_or(lookup, "SMTP_TIMEOUT_SECS", 30)?,
    }))
}
