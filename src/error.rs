//! Error types for board-sync.

use axum::http::StatusCode;

/// Top-level error type for request handling and reminder scans.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(String),

    #[error("Row not found for patch update (tab {tab}, id {id})")]
    NotFound { tab: String, id: String },

    #[error("{0}")]
    Refused(String),

    #[error("Sheets error: {0}")]
    Sheets(#[from] SheetError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

impl Error {
    /// HTTP status used when this error is reported to a caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Refused(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Config(_) | Error::Sheets(_) | Error::Notify(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote tabular store errors.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Sheets API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Missing header row in {0}")]
    MissingHeaderRow(String),

    #[error("Missing id column in {0}")]
    MissingIdColumn(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

/// Outbound notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status; `body` is its response text.
    #[error("{body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for board-sync.
pub type Result<T> = std::result::Result<T, Error>;
