//! OAuth2 access tokens for the Sheets API.
//!
//! Service accounts use the JWT-bearer grant: an RS256-signed assertion is
//! exchanged at the token endpoint for a short-lived access token, which is
//! cached until shortly before it expires.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::SheetError;

/// Scope granting read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Where access tokens come from.
pub enum TokenSource {
    /// Google service account (client email + PKCS#8 private key).
    ServiceAccount(ServiceAccount),
    /// A fixed bearer token, for local proxies and tests.
    Static(SecretString),
}

impl TokenSource {
    /// Current bearer token, refreshing it when needed.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, SheetError> {
        match self {
            TokenSource::ServiceAccount(account) => account.token(http).await,
            TokenSource::Static(token) => Ok(token.expose_secret().to_string()),
        }
    }
}

struct CachedToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

/// Service account credentials with a cached access token.
pub struct ServiceAccount {
    client_email: String,
    key_pair: RsaKeyPair,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

impl ServiceAccount {
    /// Build from the service account email and its PEM-encoded PKCS#8 key.
    pub fn new(
        client_email: impl Into<String>,
        private_key_pem: &SecretString,
        token_uri: impl Into<String>,
    ) -> Result<Self, SheetError> {
        let der = pem_to_der(private_key_pem.expose_secret())?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| SheetError::Auth(format!("Rejected private key: {e}")))?;
        Ok(Self {
            client_email: client_email.into(),
            key_pair,
            token_uri: token_uri.into(),
            cached: Mutex::new(None),
        })
    }

    async fn token(&self, http: &reqwest::Client) -> Result<String, SheetError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref()
            && token.expires_at - chrono::Duration::seconds(REFRESH_MARGIN_SECS) > now
        {
            return Ok(token.value.expose_secret().to_string());
        }

        let assertion = self.signed_assertion(now)?;
        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| SheetError::Auth(format!("Token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetError::Auth(format!("Token endpoint returned {status}: {body}")));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SheetError::Auth(format!("Invalid token response: {e}")))?;

        tracing::debug!(account = %self.client_email, "Access token refreshed");
        let value = parsed.access_token.clone();
        *cached = Some(CachedToken {
            value: SecretString::from(parsed.access_token),
            expires_at: now + chrono::Duration::seconds(parsed.expires_in),
        });
        Ok(value)
    }

    /// Build the compact `header.claims.signature` JWT assertion.
    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, SheetError> {
        let header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
        let iat = now.timestamp();
        let claims = serde_json::json!({
            "iss": self.client_email,
            "scope": SHEETS_SCOPE,
            "aud": self.token_uri,
            "iat": iat,
            "exp": iat + ASSERTION_LIFETIME_SECS,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| SheetError::Auth("Failed to sign token assertion".into()))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }
}

/// Strip PEM armor and decode the base64 body.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, SheetError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(SheetError::Auth("Private key is empty".into()));
    }
    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| SheetError::Auth(format!("Private key is not valid base64: {e}")))
}
