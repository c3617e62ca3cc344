//! Recruiter name → email address lookup, loaded from a JSON file.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::reminders::scan::normalize_recruiter_key;

/// Email addresses keyed by normalized recruiter name.
#[derive(Debug, Clone, Default)]
pub struct RecruiterDirectory {
    emails: HashMap<String, String>,
}

impl RecruiterDirectory {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let emails = pairs
            .into_iter()
            .filter_map(|(name, email)| {
                let key = normalize_recruiter_key(name.as_ref());
                let email = email.into().trim().to_string();
                (!key.is_empty() && !email.is_empty()).then_some((key, email))
            })
            .collect();
        Self { emails }
    }

    /// Parse a JSON object of `{"Recruiter Name": "address"}`.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let map: HashMap<String, String> =
            serde_json::from_str(raw).map_err(|e| ConfigError::InvalidValue {
                key: "recruiters".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_pairs(map))
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    /// Address for a recruiter, by raw or normalized name.
    pub fn email_for(&self, recruiter: &str) -> Option<&str> {
        self.emails
            .get(&normalize_recruiter_key(recruiter))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
