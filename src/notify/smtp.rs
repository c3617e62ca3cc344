//! SMTP email via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::SmtpConfig;
use crate::error::NotifyError;
use crate::notify::{Notifier, OutboundEmail};

pub struct SmtpNotifier {
    transport: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

/// Build the MIME message for `email`.
pub fn build_message(email: &OutboundEmail) -> Result<Message, NotifyError> {
    let parse = |address: &str| -> Result<Mailbox, NotifyError> {
        address.parse().map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: format!("{e}"),
        })
    };

    Message::builder()
        .from(parse(&email.from)?)
        .to(parse(&email.to)?)
        .subject(email.subject.clone())
        .body(email.text.clone())
        .map_err(|e| NotifyError::Transport(format!("Failed to build email: {e}")))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError> {
        let message = build_message(email)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| NotifyError::Transport(format!("SMTP task failed: {e}")))?
            .map_err(|e| NotifyError::Transport(format!("SMTP send failed: {e}")))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent via SMTP");
        Ok(())
    }
}
