//! The operator notification boundary.
//!
//! The pipeline only hands a subject and body across this seam; how the
//! message travels is the notifier's business.

use anyhow::{Context, Result};
use async_trait::async_trait;
use conftrail_core::NotifySettings;
use lettre::message::Message;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// Used when notification is disabled.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _subject: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// Sends mail through an STARTTLS SMTP relay, logging in with the sender's
/// credentials.
pub struct SmtpNotifier {
    settings: NotifySettings,
}

impl SmtpNotifier {
    pub fn new(settings: NotifySettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.settings
                    .from
                    .parse()
                    .context("invalid sender address")?,
            )
            .to(self.settings.to.parse().context("invalid recipient address")?)
            .subject(subject)
            .body(body.to_string())
            .context("failed to build notification message")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.smtp_relay)
            .context("failed to configure SMTP relay")?
            .credentials(Credentials::new(
                self.settings.from.clone(),
                self.settings.password.clone(),
            ))
            .build();

        mailer
            .send(email)
            .await
            .context("failed to send notification email")?;

        info!("Notification email sent to {}", self.settings.to);
        Ok(())
    }
}
