//! Record writer: locate-or-create a row by identity, merge or map the
//! payload into it, and record the declared audit events first.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::board::audit::{AuditEvent, AuditLog};
use crate::board::locator::{composite_lookup, find_row_by_composite, find_row_by_value};
use crate::board::schema::{
    HeaderIndex, apply_patch_to_row, build_header_index, cell, map_payload_to_row,
    normalize_header_label, value_text,
};
use crate::config::BoardConfig;
use crate::error::{Error, Result, SheetError};
use crate::sheets::{SheetStore, ValueInput, a1};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Full write: update the matching row or insert a new one.
    #[default]
    Create,
    /// Merge `patch` into an existing row; never creates.
    Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteAction {
    #[default]
    Upsert,
    Delete,
}

/// A parsed write request.
#[derive(Debug, Clone, Default)]
pub struct WriteRequest {
    /// Target table; the configured default when `None`.
    pub tab: Option<String>,
    pub mode: WriteMode,
    pub action: WriteAction,
    /// Top-level payload merged with the nested `row` object.
    pub data: Map<String, Value>,
    /// Fields to change in patch mode.
    pub patch: Map<String, Value>,
    pub log_events: Vec<AuditEvent>,
}

impl WriteRequest {
    /// Parse a JSON request body.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let Value::Object(mut data) = payload else {
            return Err(Error::Validation("Request body must be a JSON object".into()));
        };

        let tab = data
            .get("tab")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        let mode = match data.get("mode").and_then(Value::as_str) {
            Some("patch") => WriteMode::Patch,
            _ => WriteMode::Create,
        };
        let action = match data.get("action").and_then(Value::as_str) {
            Some("delete") => WriteAction::Delete,
            _ => WriteAction::Upsert,
        };
        let patch = match data.get("patch") {
            Some(Value::Object(patch)) => patch.clone(),
            _ => Map::new(),
        };
        let log_events = match data.get("logEvents") {
            Some(Value::Array(events)) => events
                .iter()
                .map(|event| match event {
                    Value::Object(_) => serde_json::from_value(event.clone())
                        .map_err(|e| Error::Validation(format!("Invalid logEvents entry: {e}"))),
                    other => Err(Error::Validation(format!(
                        "Invalid logEvents entry: expected an object, got {other}"
                    ))),
                })
                .collect::<Result<Vec<AuditEvent>>>()?,
            _ => Vec::new(),
        };

        if let Some(Value::Object(row)) = data.get("row").cloned() {
            data.extend(row);
        }

        Ok(Self {
            tab,
            mode,
            action,
            data,
            patch,
            log_events,
        })
    }

    /// `data.id`, else `data.client`; blank values don't count.
    pub fn identity(&self) -> Option<String> {
        ["id", "client"]
            .iter()
            .filter_map(|k| self.data.get(*k))
            .map(value_text)
            .find(|v| !v.trim().is_empty())
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row inserted, updated or patched.
    Written { id: String },
    Deleted { id: String },
    /// Delete of a row that does not exist.
    Skipped { id: String },
}

impl WriteOutcome {
    pub fn id(&self) -> &str {
        match self {
            WriteOutcome::Written { id }
            | WriteOutcome::Deleted { id }
            | WriteOutcome::Skipped { id } => id,
        }
    }
}

/// Resolved table layout for one request.
struct TableLayout {
    sheet_id: i64,
    headers: Vec<String>,
    index: HeaderIndex,
    id_column: usize,
}

/// Applies write requests to the sheet store.
pub struct RecordWriter {
    store: Arc<dyn SheetStore>,
    config: BoardConfig,
    audit: AuditLog,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn SheetStore>, config: BoardConfig) -> Self {
        let audit = AuditLog::new(config.audit_tab.clone());
        Self {
            store,
            config,
            audit,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub async fn write(&self, mut request: WriteRequest) -> Result<WriteOutcome> {
        let tab = request
            .tab
            .clone()
            .unwrap_or_else(|| self.config.default_tab.clone());

        if request.action == WriteAction::Delete && tab == self.audit.tab() {
            return Err(Error::Refused(format!("Refusing to delete {tab} rows.")));
        }

        let id = match request.identity() {
            Some(id) => id,
            None if request.mode == WriteMode::Patch => {
                return Err(Error::Validation("Missing id".into()));
            }
            None => Uuid::new_v4().to_string(),
        };
        request.data.insert("id".into(), Value::String(id.clone()));

        if request.log_events.is_empty() {
            warn!(tab = %tab, id = %id, mode = ?request.mode, "Write request has no logEvents");
        }

        let layout = self.layout(&tab).await?;
        let position = self.locate(&tab, &layout, &id, &request).await?;

        self.audit
            .append(self.store.as_ref(), &request.log_events, &request.data)
            .await?;

        if request.action == WriteAction::Delete {
            return match position {
                None => {
                    info!(tab = %tab, id = %id, "Delete skipped, row not found");
                    Ok(WriteOutcome::Skipped { id })
                }
                Some(position) => {
                    // Data position i is zero-based sheet row i + 1.
                    self.store
                        .delete_rows(layout.sheet_id, position + 1, position + 2)
                        .await?;
                    info!(tab = %tab, id = %id, row = position + 2, "Row deleted");
                    Ok(WriteOutcome::Deleted { id })
                }
            };
        }

        if request.mode == WriteMode::Patch && position.is_none() {
            return Err(Error::NotFound { tab, id });
        }

        let width = layout.headers.len();
        let row_number = match position {
            Some(position) => position + 2,
            None => {
                self.store.insert_rows(layout.sheet_id, 1, 2).await?;
                2
            }
        };
        let range = a1::row_range(&tab, row_number, width);

        let values = match request.mode {
            WriteMode::Patch => {
                let existing = self.read_row(&range).await?;
                let mut patch = request.patch;
                if cell(&existing, layout.id_column).trim().is_empty()
                    && !patch.contains_key("id")
                {
                    patch.insert("id".into(), Value::String(id.trim().to_string()));
                }
                apply_patch_to_row(&layout.headers, &existing, &patch)
            }
            WriteMode::Create => {
                let existing = match position {
                    Some(_) => self.read_row(&range).await?,
                    None => Vec::new(),
                };
                map_payload_to_row(&layout.headers, &request.data, &existing)
            }
        };

        self.store
            .update_range(&range, vec![values], ValueInput::UserEntered)
            .await?;
        info!(
            tab = %tab,
            id = %id,
            row = row_number,
            inserted = position.is_none(),
            mode = ?request.mode,
            "Row written"
        );
        Ok(WriteOutcome::Written { id })
    }

    async fn layout(&self, tab: &str) -> Result<TableLayout> {
        let sheet_id = self
            .store
            .sheet_id(tab)
            .await?
            .ok_or_else(|| SheetError::SheetNotFound(tab.to_string()))?;

        let headers = self.store.read_header(tab).await?;
        if headers.is_empty() {
            return Err(SheetError::MissingHeaderRow(tab.to_string()).into());
        }
        let index = build_header_index(&headers);

        let mut id_column = headers
            .iter()
            .position(|h| normalize_header_label(h) == "id");
        if id_column.is_none() && self.config.client_keyed_tabs.iter().any(|t| t == tab) {
            id_column = headers.iter().position(|h| {
                let key = normalize_header_label(h);
                key == "client" || key == "clientname"
            });
        }
        let id_column = id_column.ok_or_else(|| SheetError::MissingIdColumn(tab.to_string()))?;

        Ok(TableLayout {
            sheet_id,
            headers,
            index,
            id_column,
        })
    }

    /// Tiered lookup: id column, then `key` column, then (patch only) the
    /// composite attribute match.
    async fn locate(
        &self,
        tab: &str,
        layout: &TableLayout,
        id: &str,
        request: &WriteRequest,
    ) -> Result<Option<usize>> {
        let ids = self.store.read_column(tab, layout.id_column).await?;
        if let Some(position) = find_row_by_value(&ids, id) {
            return Ok(Some(position));
        }

        if let Some(&key_column) = layout.index.get("key") {
            let keys = self.store.read_column(tab, key_column).await?;
            if let Some(position) = find_row_by_value(&keys, id) {
                return Ok(Some(position));
            }
        }

        if request.mode == WriteMode::Patch {
            let pairs = composite_lookup(&request.data, &layout.index);
            if pairs.len() >= crate::board::locator::MIN_COMPOSITE_FIELDS {
                let rows = self
                    .store
                    .read_data_rows(tab, layout.headers.len())
                    .await?;
                if let Some(position) = find_row_by_composite(&rows, &pairs) {
                    info!(tab = %tab, id = %id, row = position + 2, "Matched row by composite lookup");
                    return Ok(Some(position));
                }
            }
        }

        Ok(None)
    }

    async fn read_row(&self, range: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .read_range(range)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MemorySheets;
    use serde_json::json;

    const HEADERS: &[&str] = &[
        "ID", "Client", "Job Title", "Candidate", "Recruiter", "Stage", "Private Notes", "Key",
    ];

    async fn setup() -> (Arc<MemorySheets>, RecordWriter) {
        let store = Arc::new(MemorySheets::new());
        store
            .add_tab(
                "ActiveBoard",
                &[
                    HEADERS.to_vec(),
                    vec!["r1", "Acme", "Welder", "Ann", "Bo", "Screen", "secret", "k-1"],
                    vec!["", "Beta", "Fitter", "Cy", "Dee", "Offer", "", ""],
                ],
            )
            .await;
        store
            .add_tab("ActivityLog", &[vec!["Timestamp", "Row ID"]])
            .await;
        let writer = RecordWriter::new(store.clone(), BoardConfig::default());
        (store, writer)
    }

    fn request(payload: Value) -> WriteRequest {
        WriteRequest::from_payload(payload).unwrap()
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    // ── Request parsing ─────────────────────────────────────────────

    #[test]
    fn nested_row_values_win() {
        let req = request(json!({
            "client": "Outer",
            "mode": "patch",
            "row": {"client": "Inner", "id": "x1"},
            "patch": {"stage": "Offer"},
        }));
        assert_eq!(req.data.get("client"), Some(&json!("Inner")));
        assert_eq!(req.mode, WriteMode::Patch);
        assert_eq!(req.identity().as_deref(), Some("x1"));
        assert_eq!(req.patch.get("stage"), Some(&json!("Offer")));
    }

    #[test]
    fn identity_falls_back_to_client() {
        let req = request(json!({"id": "", "client": "Acme"}));
        assert_eq!(req.identity().as_deref(), Some("Acme"));
        assert_eq!(request(json!({})).identity(), None);
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(matches!(
            WriteRequest::from_payload(json!([1, 2])),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            WriteRequest::from_payload(json!({"logEvents": ["oops"]})),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn numeric_audit_fields_do_not_block_the_write() {
        let (store, writer) = setup().await;
        let outcome = writer
            .write(request(json!({
                "mode": "patch",
                "id": "r1",
                "patch": {"stage": "Offer"},
                "logEvents": [{"eventType": "stage_change", "eventDate": 20250610, "rowId": 7}],
            })))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written { id: "r1".into() });

        assert_eq!(store.rows("ActiveBoard").await[1][5], "Offer");
        let log = store.rows("ActivityLog").await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[1][1], "7");
        assert_eq!(log[1][11], "20250610");
    }

    // ── Create / upsert ─────────────────────────────────────────────

    #[tokio::test]
    async fn create_without_identity_inserts_under_header() {
        let (store, writer) = setup().await;
        let outcome = writer
            .write(request(json!({
                "candidate": "Eve",
                "stage": "Screen",
                "logEvents": [{"eventType": "created"}],
            })))
            .await
            .unwrap();

        let WriteOutcome::Written { id } = outcome else {
            panic!("expected a write");
        };
        assert!(!id.is_empty());

        let rows = store.rows("ActiveBoard").await;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][0], id);
        assert_eq!(rows[1][3], "Eve");
        assert_eq!(rows[1][7], id, "key column falls back to id");
        assert_eq!(rows[2][0], "r1");

        let log = store.rows("ActivityLog").await;
        assert_eq!(log[1][1], id, "audit row reuses the generated id");
    }

    #[tokio::test]
    async fn create_with_existing_identity_updates_in_place() {
        let (store, writer) = setup().await;
        writer
            .write(request(json!({
                "id": "R1",
                "client": "Acme",
                "stage": "Offer",
                "privateNotes": "ignored",
            })))
            .await
            .unwrap();

        let rows = store.rows("ActiveBoard").await;
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            strings(&["R1", "Acme", "", "", "", "Offer", "secret", "R1"])
        );
    }

    #[tokio::test]
    async fn create_finds_row_by_key_column() {
        let (store, writer) = setup().await;
        writer
            .write(request(json!({"id": "k-1", "stage": "Hired"})))
            .await
            .unwrap();
        let rows = store.rows("ActiveBoard").await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][5], "Hired");
    }

    // ── Patch ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn patch_changes_only_named_fields() {
        let (store, writer) = setup().await;
        let before = store.rows("ActiveBoard").await;
        writer
            .write(request(json!({
                "id": " r1 ",
                "mode": "patch",
                "patch": {"stage": "Interview"},
            })))
            .await
            .unwrap();

        let after = store.rows("ActiveBoard").await;
        let mut expected = before[1].clone();
        expected[5] = "Interview".into();
        assert_eq!(after[1], expected);
        assert_eq!(after[2], before[2]);
        assert!(
            store
                .operations()
                .await
                .iter()
                .all(|op| !op.starts_with("insert")),
        );
    }

    #[tokio::test]
    async fn patch_by_composite_fills_empty_id() {
        let (store, writer) = setup().await;
        let outcome = writer
            .write(request(json!({
                "id": "new-id",
                "mode": "patch",
                "row": {"client": "beta", "candidate": "CY"},
                "patch": {"stage": "Hired"},
            })))
            .await
            .unwrap();
        assert_eq!(outcome.id(), "new-id");

        let rows = store.rows("ActiveBoard").await;
        assert_eq!(rows[2][0], "new-id");
        assert_eq!(rows[2][5], "Hired");
        assert_eq!(rows[2][1], "Beta");
    }

    #[tokio::test]
    async fn patch_single_attribute_match_is_not_found() {
        let (store, writer) = setup().await;
        let err = writer
            .write(request(json!({
                "id": "nope",
                "mode": "patch",
                "row": {"client": "Beta"},
                "patch": {"stage": "Hired"},
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn patch_without_identity_fails_before_io() {
        let (store, writer) = setup().await;
        let err = writer
            .write(request(json!({"mode": "patch", "patch": {"stage": "x"}})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Missing id"));
        assert!(store.operations().await.is_empty());
    }

    // ── Delete ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn delete_removes_row_and_shifts() {
        let (store, writer) = setup().await;
        let outcome = writer
            .write(request(json!({"id": "r1", "action": "delete"})))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Deleted { id: "r1".into() });
        let rows = store.rows("ActiveBoard").await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "Beta");
    }

    #[tokio::test]
    async fn delete_missing_row_is_skipped() {
        let (_store, writer) = setup().await;
        let outcome = writer
            .write(request(json!({"id": "ghost", "action": "delete"})))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Skipped { id: "ghost".into() });
    }

    #[tokio::test]
    async fn delete_on_audit_table_is_refused() {
        let (store, writer) = setup().await;
        let err = writer
            .write(request(json!({
                "tab": "ActivityLog",
                "id": "r1",
                "action": "delete",
                "logEvents": [{"eventType": "delete"}],
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Refused(_)));
        assert!(store.operations().await.is_empty());
    }

    // ── Ordering and table errors ───────────────────────────────────

    #[tokio::test]
    async fn audit_rows_precede_mutation_and_survive_failure() {
        let (store, writer) = setup().await;
        store.fail_writes_to("ActiveBoard").await;
        let result = writer
            .write(request(json!({
                "id": "r1",
                "stage": "Offer",
                "logEvents": [{"eventType": "stage_change"}],
            })))
            .await;
        assert!(matches!(result, Err(Error::Sheets(_))));
        assert_eq!(store.operations().await, vec!["append ActivityLog!A:Z"]);
        assert_eq!(store.rows("ActivityLog").await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tab_and_missing_headers() {
        let (store, writer) = setup().await;
        let err = writer
            .write(request(json!({"tab": "Nope", "id": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sheets error: Sheet not found: Nope");

        store.add_tab::<&str>("Empty", &[]).await;
        let err = writer
            .write(request(json!({"tab": "Empty", "id": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sheets error: Missing header row in Empty");

        store.add_tab("NoId", &[vec!["Client", "Stage"]]).await;
        let err = writer
            .write(request(json!({"tab": "NoId", "id": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sheets error: Missing id column in NoId");
    }

    #[tokio::test]
    async fn client_keyed_table_uses_client_column() {
        let (store, writer) = setup().await;
        store
            .add_tab(
                "CRF_Summary",
                &[vec!["Client Name", "CRF Score"], vec!["Acme", "40"]],
            )
            .await;
        writer
            .write(request(json!({
                "tab": "CRF_Summary",
                "client": "acme",
                "crfScore": 72,
            })))
            .await
            .unwrap();
        let rows = store.rows("CRF_Summary").await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], strings(&["acme", "72"]));
    }
}
