//! Append-only audit trail of board changes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::board::schema::{first_present, value_text};
use crate::error::SheetError;
use crate::sheets::{SheetStore, ValueInput};

/// One declared change, as sent by the client in `logEvents`.
///
/// Every field is optional; the record fields fall back to the request data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditEvent {
    pub timestamp: Option<Value>,
    pub row_id: Option<Value>,
    pub client: Option<Value>,
    pub job_title: Option<Value>,
    pub candidate: Option<Value>,
    pub recruiter: Option<Value>,
    pub business_line: Option<Value>,
    pub event_type: Option<Value>,
    pub field: Option<Value>,
    pub previous_value: Option<Value>,
    pub new_value: Option<Value>,
    pub event_date: Option<Value>,
    pub source: Option<Value>,
    pub updated_by: Option<Value>,
}

/// Cell text of a declared value; any JSON scalar is accepted.
fn text(value: &Option<Value>) -> String {
    value.as_ref().map(value_text).unwrap_or_default()
}

fn given(value: &Option<Value>) -> Option<String> {
    Some(text(value)).filter(|v| !v.is_empty())
}

fn or_data(value: &Option<Value>, data: &Map<String, Value>, aliases: &[&str]) -> String {
    given(value)
        .or_else(|| first_present(data, aliases))
        .unwrap_or_default()
}

/// The 14-column audit row for `event`.
pub fn to_log_row(event: &AuditEvent, data: &Map<String, Value>, now: DateTime<Utc>) -> Vec<String> {
    vec![
        given(&event.timestamp)
            .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        or_data(&event.row_id, data, &["id"]),
        or_data(&event.client, data, &["client"]),
        or_data(&event.job_title, data, &["jobTitle", "job_title"]),
        or_data(&event.candidate, data, &["candidate", "candidate_name"]),
        or_data(&event.recruiter, data, &["recruiter"]),
        or_data(&event.business_line, data, &["businessLine", "business_line"]),
        text(&event.event_type),
        text(&event.field),
        text(&event.previous_value),
        text(&event.new_value),
        text(&event.event_date),
        text(&event.source),
        text(&event.updated_by),
    ]
}

/// Writes audit rows to one table.
pub struct AuditLog {
    tab: String,
}

impl AuditLog {
    pub fn new(tab: impl Into<String>) -> Self {
        Self { tab: tab.into() }
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    /// Append one RAW row per event. No-op for an empty list.
    pub async fn append(
        &self,
        store: &dyn SheetStore,
        events: &[AuditEvent],
        data: &Map<String, Value>,
    ) -> Result<(), SheetError> {
        if events.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let rows = events.iter().map(|e| to_log_row(e, data, now)).collect();
        store
            .append_rows(&format!("{}!A:Z", self.tab), rows, ValueInput::Raw)
            .await?;
        debug!(tab = %self.tab, events = events.len(), "Audit rows appended");
        Ok(())
    }
}
