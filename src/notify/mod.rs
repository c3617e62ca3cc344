//! Outbound email senders.

pub mod resend;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::NotifierConfig;
use crate::error::NotifyError;

pub use resend::ResendNotifier;
pub use smtp::SmtpNotifier;

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sender name for logs.
    fn name(&self) -> &str;

    /// Send one email. A provider rejection carries the provider's response text.
    async fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError>;
}

/// Build the configured sender, or `None` when email is disabled.
pub fn build_notifier(config: &NotifierConfig) -> Result<Option<Arc<dyn Notifier>>, NotifyError> {
    let notifier: Arc<dyn Notifier> = match config {
        NotifierConfig::Resend { api_key, api_url } => {
            Arc::new(ResendNotifier::new(api_key.clone(), api_url.clone()))
        }
        NotifierConfig::Smtp(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        NotifierConfig::Disabled => return Ok(None),
    };
    Ok(Some(notifier))
}
