//! Outbound delivery — one rate-limited, retried message per recipient.
//!
//! The engine composes three pieces around a `Mailer`: the rolling-window
//! rate limiter (every attempt takes a slot), message assembly (template
//! body plus one attachment per staged document), and bounded
//! exponential-backoff retry. Dispatch only touches the network; the
//! staging and processed trees are someone else's job.

mod rate_limit;
mod retry;

pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::{error, info};

use crate::config::{Config, DeliverySettings, EmailSettings};
use crate::error::DispatchError;

/// Width of the rolling rate-limit window.
const RATE_WINDOW: Duration = Duration::from_secs(60);

static PDF_CONTENT_TYPE: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::parse("application/pdf").unwrap());

// ── Mailer ──────────────────────────────────────────────────────────

/// Transport seam for outbound mail; tests substitute delivery here.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), DispatchError>;
}

/// Production mailer: authenticated STARTTLS SMTP via lettre.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn from_settings(settings: &EmailSettings) -> Result<Self, DispatchError> {
        let credentials = Credentials::new(
            settings.sender_address.clone(),
            settings.sender_password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&settings.smtp_host)
            .map_err(|e| DispatchError::Transport(format!("SMTP relay setup failed: {e}")))?
            .port(settings.smtp_port)
            .credentials(credentials)
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<(), DispatchError> {
        // lettre's blocking transport; keep it off the async workers
        let transport = self.transport.clone();
        let message = message.clone();
        tokio::task::spawn_blocking(move || {
            transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| DispatchError::Transport(format!("SMTP send failed: {e}")))
        })
        .await
        .map_err(|e| DispatchError::Transport(format!("send task failed: {e}")))?
    }
}

// ── Message assembly ────────────────────────────────────────────────

/// Assemble one outbound message: template body plus an attachment per
/// staged document.
pub async fn build_message(
    email: &EmailSettings,
    recipient: &str,
    attachments: &[PathBuf],
) -> Result<Message, DispatchError> {
    let from: Mailbox = email
        .sender_address
        .parse()
        .map_err(|e| DispatchError::Address {
            address: email.sender_address.clone(),
            reason: format!("{e}"),
        })?;
    let to: Mailbox = recipient.parse().map_err(|e| DispatchError::Address {
        address: recipient.to_string(),
        reason: format!("{e}"),
    })?;

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
    for path in attachments {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| DispatchError::Attachment {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let attachment = Attachment::new(file_name).body(content, PDF_CONTENT_TYPE.clone());
        parts = parts.singlepart(attachment);
    }

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .multipart(parts)
        .map_err(|e| DispatchError::Build {
            recipient: recipient.to_string(),
            reason: format!("{e}"),
        })
}

// ── Engine ──────────────────────────────────────────────────────────

/// Rate-limited, retrying sender for recipient groups.
pub struct DispatchEngine {
    mailer: Arc<dyn Mailer>,
    email: EmailSettings,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl DispatchEngine {
    /// Engine wired to the production SMTP mailer.
    pub fn from_config(config: &Config) -> Result<Self, DispatchError> {
        let mailer = Arc::new(SmtpMailer::from_settings(&config.email)?);
        Ok(Self::new(mailer, config.email.clone(), &config.delivery))
    }

    pub fn new(mailer: Arc<dyn Mailer>, email: EmailSettings, delivery: &DeliverySettings) -> Self {
        Self {
            mailer,
            email,
            limiter: RateLimiter::new(delivery.max_sends_per_minute as usize, RATE_WINDOW),
            retry: RetryPolicy::new(delivery.max_attempts, delivery.retry_base()),
        }
    }

    /// Send one recipient group. Returns true on success; on exhaustion
    /// the failure is logged and the group's documents stay in staging.
    ///
    /// The message is built once; only the send is retried. Every
    /// attempt, retries included, takes a rate-limit slot.
    pub async fn deliver(&self, recipient: &str, attachments: &[PathBuf]) -> bool {
        let message = match build_message(&self.email, recipient, attachments).await {
            Ok(message) => message,
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Could not build message");
                return false;
            }
        };

        let outcome = {
            let limiter = &self.limiter;
            let mailer = &self.mailer;
            let message = &message;
            self.retry
                .run(move || async move {
                    limiter.acquire().await;
                    mailer.send(message).await
                })
                .await
        };

        match outcome {
            Ok(()) => {
                info!(recipient = %recipient, attachments = attachments.len(), "Email sent");
                true
            }
            Err(e) => {
                error!(
                    recipient = %recipient,
                    attempts = self.retry.max_attempts,
                    error = %e,
                    "Giving up on recipient after exhausting retries"
                );
                false
            }
        }
    }
}
