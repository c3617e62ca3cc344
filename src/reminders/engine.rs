//! Reminder scan: read task rows, send grouped notifications, stamp rows.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::board::schema::{build_header_index, normalize_header_label};
use crate::config::ReminderConfig;
use crate::error::{ConfigError, Result, SheetError};
use crate::notify::{Notifier, OutboundEmail};
use crate::reminders::directory::RecruiterDirectory;
use crate::reminders::scan::{completion_body, completion_subject, plan_scan, stamp_row};
use crate::sheets::{SheetStore, ValueInput, a1};

/// Outcome of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Notifications sent.
    pub sent: usize,
    /// Rows stamped.
    pub updated: usize,
    /// Recruiter groups without a known address.
    pub skipped: usize,
}

/// Runs reminder scans against one task table.
pub struct ReminderEngine {
    store: Arc<dyn SheetStore>,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
}

impl ReminderEngine {
    pub fn new(
        store: Arc<dyn SheetStore>,
        notifier: Arc<dyn Notifier>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// One full scan. Any remote failure aborts the scan; rows already
    /// stamped stay stamped.
    pub async fn run_scan(&self, now: DateTime<Utc>) -> Result<ScanReport> {
        let directory = RecruiterDirectory::load(&self.config.recruiters_path).await?;
        let tab = self.config.tab.as_str();
        let mut report = ScanReport::default();

        let headers = self.store.read_header(tab).await?;
        if headers.is_empty() {
            info!(tab = %tab, "Task table is empty, nothing to scan");
            return Ok(report);
        }
        if !headers.iter().any(|h| normalize_header_label(h) == "id") {
            return Err(SheetError::MissingIdColumn(tab.to_string()).into());
        }

        let index = build_header_index(&headers);
        let width = headers.len();
        let rows = self.store.read_data_rows(tab, width).await?;
        let plan = plan_scan(&headers, &rows, now, &self.config.schedule);
        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        // ── Reminders ───────────────────────────────────────────────
        for group in &plan.groups {
            let Some(to) = directory.email_for(&group.key) else {
                warn!(recruiter = %group.key, tasks = group.tasks.len(), "No email for recruiter, skipping");
                report.skipped += 1;
                continue;
            };

            self.notifier
                .send(&OutboundEmail {
                    from: self.config.from_email.clone(),
                    to: to.to_string(),
                    subject: group.subject(),
                    text: group.body(&self.config.schedule),
                })
                .await?;
            report.sent += 1;

            for task in &group.tasks {
                let values = stamp_row(
                    &index,
                    width,
                    &task.row,
                    &[
                        (task.stage.stamp_column(), stamp.as_str()),
                        ("tasklastnotifiedat", stamp.as_str()),
                    ],
                );
                self.store
                    .update_range(
                        &a1::row_range(tab, task.row_number, width),
                        vec![values],
                        ValueInput::UserEntered,
                    )
                    .await?;
                report.updated += 1;
            }
            info!(recruiter = %group.key, tasks = group.tasks.len(), "Reminder sent");
        }

        // ── Completion summary ──────────────────────────────────────
        if !plan.completed.is_empty() {
            self.notifier
                .send(&OutboundEmail {
                    from: self.config.from_email.clone(),
                    to: self.config.leadership_email.clone(),
                    subject: completion_subject(&plan.completed),
                    text: completion_body(&plan.completed),
                })
                .await?;
            report.sent += 1;

            for task in &plan.completed {
                let values = stamp_row(
                    &index,
                    width,
                    &task.row,
                    &[("taskcompletednotifiedat", stamp.as_str())],
                );
                self.store
                    .update_range(
                        &a1::row_range(tab, task.row_number, width),
                        vec![values],
                        ValueInput::UserEntered,
                    )
                    .await?;
                report.updated += 1;
            }
            info!(tasks = plan.completed.len(), "Completion summary sent");
        }

        info!(
            sent = report.sent,
            updated = report.updated,
            skipped = report.skipped,
            notifier = self.notifier.name(),
            "Reminder scan finished"
        );
        Ok(report)
    }
}

/// Parse a cron expression (seconds field included, e.g. `0 */15 * * * *`).
pub fn parse_cron(expr: &str) -> std::result::Result<cron::Schedule, ConfigError> {
    cron::Schedule::from_str(expr).map_err(|e| ConfigError::InvalidValue {
        key: "TASK_REMINDER_CRON".to_string(),
        message: format!("invalid cron: {e}"),
    })
}

/// Spawn the background task that runs a scan at every fire time of `schedule`.
pub fn spawn_reminder_ticker(
    engine: Arc<ReminderEngine>,
    schedule: cron::Schedule,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                warn!("Reminder schedule has no upcoming fire time, ticker stopped");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            match engine.run_scan(Utc::now()).await {
                Ok(report) => info!(
                    sent = report.sent,
                    updated = report.updated,
                    skipped = report.skipped,
                    "Scheduled reminder scan complete"
                ),
                Err(e) => error!(error = %e, "Scheduled reminder scan failed"),
            }
        }
    })
}
