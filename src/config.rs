//! Configuration types.
//!
//! Everything is read from the environment. Each section has a `from_env()`
//! constructor and a `from_lookup()` twin that takes the variable source as a
//! closure, which keeps tests away from process-global state.

use std::path::PathBuf;

use chrono::NaiveTime;
use chrono_tz::Tz;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::reminders::schedule::ReminderSchedule;
use crate::sheets::auth::DEFAULT_TOKEN_URI;
use crate::sheets::google::DEFAULT_API_BASE;

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required<F>(get: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn time_or<F>(get: &F, key: &str, default: NaiveTime) -> Result<NaiveTime, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected HH:MM ({e})"),
            }
        }),
        None => Ok(default),
    }
}

/// Private keys pasted into env vars usually carry literal `\n` sequences.
pub fn unescape_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

/// Google Sheets access.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub client_email: String,
    pub private_key: SecretString,
    pub api_base: String,
    pub token_uri: String,
}

impl SheetsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            spreadsheet_id: required(&get, "GOOGLE_SHEET_ID")?,
            client_email: required(&get, "GOOGLE_CLIENT_EMAIL")?,
            private_key: SecretString::from(unescape_private_key(&required(
                &get,
                "GOOGLE_PRIVATE_KEY",
            )?)),
            api_base: get("GOOGLE_SHEETS_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token_uri: get("GOOGLE_TOKEN_URI").unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }
}

/// Record writer settings.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Table used when a request names none.
    pub default_tab: String,
    /// Append-only audit table; deletes against it are refused.
    pub audit_tab: String,
    /// Tables whose identity column may be `client` / `clientname`.
    pub client_keyed_tabs: Vec<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_tab: "ActiveBoard".to_string(),
            audit_tab: "ActivityLog".to_string(),
            client_keyed_tabs: vec!["CRF_Summary".to_string()],
        }
    }
}

impl BoardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            default_tab: get("BOARD_DEFAULT_TAB").unwrap_or(defaults.default_tab),
            audit_tab: get("BOARD_AUDIT_TAB").unwrap_or(defaults.audit_tab),
            client_keyed_tabs: get("BOARD_CLIENT_KEYED_TABS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.client_keyed_tabs),
        }
    }
}

/// Reminder scan settings.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Table holding task rows.
    pub tab: String,
    pub schedule: ReminderSchedule,
    pub from_email: String,
    /// Receives the completed-tasks summary.
    pub leadership_email: String,
    pub recruiters_path: PathBuf,
    /// Cron expression for the in-process ticker (disabled when unset).
    pub cron: Option<String>,
    /// Shared secret required by the HTTP trigger when set.
    pub cron_secret: Option<SecretString>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            tab: "ActiveBoard".to_string(),
            schedule: ReminderSchedule::default(),
            from_email: "missioncontrol@mountindie.com".to_string(),
            leadership_email: "operations@mountindie.com".to_string(),
            recruiters_path: PathBuf::from("data/recruiters.json"),
            cron: None,
            cron_secret: None,
        }
    }
}

impl ReminderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let base = defaults.schedule;

        let timezone: Tz = parse_or(&get, "TASK_TIMEZONE", base.timezone)?;
        let first_minutes: i64 = parse_or(
            &get,
            "TASK_FIRST_REMINDER_MINUTES",
            base.first_after.num_minutes(),
        )?;
        if first_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "TASK_FIRST_REMINDER_MINUTES".to_string(),
                message: "must be positive".to_string(),
            });
        }

        let schedule = ReminderSchedule {
            timezone,
            first_after: chrono::Duration::minutes(first_minutes),
            second_at: time_or(&get, "TASK_SECOND_REMINDER_AT", base.second_at)?,
            third_at: time_or(&get, "TASK_THIRD_REMINDER_AT", base.third_at)?,
        };

        Ok(Self {
            tab: get("TASK_TAB").unwrap_or(defaults.tab),
            schedule,
            from_email: get("TASK_FROM_EMAIL").unwrap_or(defaults.from_email),
            leadership_email: get("LEADERSHIP_EMAIL").unwrap_or(defaults.leadership_email),
            recruiters_path: get("RECRUITERS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.recruiters_path),
            cron: get("TASK_REMINDER_CRON"),
            cron_secret: get("CRON_SECRET").map(SecretString::from),
        })
    }
}

/// SMTP relay credentials.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Which outbound email sender to use.
#[derive(Debug, Clone)]
pub enum NotifierConfig {
    Resend { api_key: SecretString, api_url: String },
    Smtp(SmtpConfig),
    /// No sender configured; reminder scans fail with a configuration error.
    Disabled,
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = get("RESEND_API_KEY") {
            return Ok(NotifierConfig::Resend {
                api_key: SecretString::from(api_key),
                api_url: get("RESEND_API_URL")
                    .unwrap_or_else(|| crate::notify::resend::DEFAULT_API_URL.to_string()),
            });
        }

        let Some(host) = get("EMAIL_SMTP_HOST") else {
            return Ok(NotifierConfig::Disabled);
        };
        Ok(NotifierConfig::Smtp(SmtpConfig {
            host,
            port: parse_or(&get, "EMAIL_SMTP_PORT", 587)?,
            username: get("EMAIL_USERNAME").unwrap_or_default(),
            password: SecretString::from(get("EMAIL_PASSWORD").unwrap_or_default()),
        }))
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotifierConfig::Resend { .. } => "resend",
            NotifierConfig::Smtp(_) => "smtp",
            NotifierConfig::Disabled => "disabled",
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Single origin allowed by CORS.
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            allowed_origin: "https://meeting-board-sl.vercel.app".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            port: parse_or(&get, "BOARD_PORT", defaults.port)?,
            allowed_origin: get("BOARD_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
        })
    }
}
