//! Board Sync: recruiting pipeline records and task reminders on Google Sheets.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod notify;
pub mod reminders;
pub mod sheets;

pub use error::{Error, Result};
