//! Resend HTTP email API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::NotifyError;
use crate::notify::{Notifier, OutboundEmail};

pub const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: SecretString,
    api_url: String,
}

impl ResendNotifier {
    pub fn new(api_key: SecretString, api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    fn name(&self) -> &str {
        "resend"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(email)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body = if body.is_empty() {
                "Resend request failed.".to_string()
            } else {
                body
            };
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent via Resend");
        Ok(())
    }
}
