//! `SheetStore`: the async interface to the remote tabular store.
//!
//! Every call is keyed by an A1 range string. Reads return rows of cell text
//! with trailing empty cells and trailing empty rows trimmed, the way the
//! Sheets values API reports them.

use async_trait::async_trait;

use crate::error::SheetError;
use crate::sheets::a1;

/// How written cell values are interpreted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInput {
    /// Stored verbatim.
    Raw,
    /// Parsed as if typed into the UI (dates, numbers, formulas).
    UserEntered,
}

impl ValueInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

/// Backend-agnostic remote table store.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Resolve a table title to its numeric sheet id (needed for structural edits).
    async fn sheet_id(&self, tab: &str) -> Result<Option<i64>, SheetError>;

    /// Read every row intersecting `range`.
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError>;

    /// Append rows after the last non-empty row of the table in `range`.
    async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInput,
    ) -> Result<(), SheetError>;

    /// Overwrite the cells of `range`, starting at its top-left corner.
    async fn update_range(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInput,
    ) -> Result<(), SheetError>;

    /// Insert blank rows `[start, end)` (zero-based sheet indices).
    async fn insert_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), SheetError>;

    /// Delete rows `[start, end)` (zero-based sheet indices); later rows shift up.
    async fn delete_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), SheetError>;

    // ── Convenience reads ───────────────────────────────────────────

    /// Read the header row of a table (empty when the table is blank).
    async fn read_header(&self, tab: &str) -> Result<Vec<String>, SheetError> {
        let rows = self.read_range(&a1::header_range(tab)).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    /// Read one column's values for every data row (header excluded).
    ///
    /// Index `i` of the result is sheet row `i + 2`.
    async fn read_column(&self, tab: &str, column: usize) -> Result<Vec<String>, SheetError> {
        let rows = self.read_range(&a1::column_range(tab, column)).await?;
        Ok(rows
            .into_iter()
            .skip(1)
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    /// Read all data rows (header excluded), `width` columns wide at most.
    ///
    /// Index `i` of the result is sheet row `i + 2`.
    async fn read_data_rows(&self, tab: &str, width: usize) -> Result<Vec<Vec<String>>, SheetError> {
        self.read_range(&a1::data_range(tab, width)).await
    }
}
