//! Task reminder scheduler.

pub mod directory;
pub mod engine;
pub mod scan;
pub mod schedule;

pub use directory::RecruiterDirectory;
pub use engine::{ReminderEngine, ScanReport, parse_cron, spawn_reminder_ticker};
pub use schedule::{ReminderSchedule, ReminderStage};
