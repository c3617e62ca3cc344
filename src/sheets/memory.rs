//! In-memory `SheetStore` with the same A1 range semantics as the remote API.
//!
//! Used by tests and local runs. Every mutating call is recorded in an
//! operation log so callers can assert on ordering.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SheetError;
use crate::sheets::a1::A1Range;
use crate::sheets::traits::{SheetStore, ValueInput};

struct MemoryTab {
    sheet_id: i64,
    rows: Vec<Vec<String>>,
}

#[derive(Default)]
struct Inner {
    tabs: HashMap<String, MemoryTab>,
    next_id: i64,
    ops: Vec<String>,
    failing_tabs: HashSet<String>,
}

/// In-memory spreadsheet.
#[derive(Default)]
pub struct MemorySheets {
    inner: RwLock<Inner>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a tab with the given rows.
    pub async fn add_tab<S: AsRef<str>>(&self, tab: &str, rows: &[Vec<S>]) {
        let mut inner = self.inner.write().await;
        let sheet_id = inner.next_id;
        inner.next_id += 1;
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.as_ref().to_string()).collect())
            .collect();
        inner
            .tabs
            .insert(tab.to_string(), MemoryTab { sheet_id, rows });
    }

    /// Snapshot of a tab's rows, exactly as stored (no trimming).
    pub async fn rows(&self, tab: &str) -> Vec<Vec<String>> {
        self.inner
            .read()
            .await
            .tabs
            .get(tab)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Mutations performed so far, e.g. `"append ActivityLog!A:Z"`.
    pub async fn operations(&self) -> Vec<String> {
        self.inner.read().await.ops.clone()
    }

    /// Make every subsequent mutation of `tab` fail with a 503.
    pub async fn fail_writes_to(&self, tab: &str) {
        self.inner.write().await.failing_tabs.insert(tab.to_string());
    }

    fn check_writable(inner: &Inner, tab: &str) -> Result<(), SheetError> {
        if inner.failing_tabs.contains(tab) {
            return Err(SheetError::Status {
                status: 503,
                body: format!("writes to {tab} are unavailable"),
            });
        }
        Ok(())
    }

    fn tab_for_id(inner: &Inner, sheet_id: i64) -> Result<String, SheetError> {
        inner
            .tabs
            .iter()
            .find(|(_, t)| t.sheet_id == sheet_id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| SheetError::SheetNotFound(sheet_id.to_string()))
    }
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn sheet_id(&self, tab: &str) -> Result<Option<i64>, SheetError> {
        Ok(self.inner.read().await.tabs.get(tab).map(|t| t.sheet_id))
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let parsed = A1Range::parse(range)?;
        let inner = self.inner.read().await;
        let tab = inner
            .tabs
            .get(&parsed.tab)
            .ok_or_else(|| SheetError::SheetNotFound(parsed.tab.clone()))?;

        let first_row = parsed.start_row.unwrap_or(0);
        let last_row = parsed.end_row.unwrap_or(usize::MAX);
        let first_col = parsed.start_col.unwrap_or(0);
        let last_col = parsed.end_col.unwrap_or(usize::MAX);

        let mut out: Vec<Vec<String>> = tab
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| *i >= first_row && *i <= last_row)
            .map(|(_, row)| {
                let cells = row
                    .iter()
                    .enumerate()
                    .filter(|(c, _)| *c >= first_col && *c <= last_col)
                    .map(|(_, cell)| cell.clone())
                    .collect();
                trim_row(cells)
            })
            .collect();

        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        _input: ValueInput,
    ) -> Result<(), SheetError> {
        let parsed = A1Range::parse(range)?;
        let mut inner = self.inner.write().await;
        Self::check_writable(&inner, &parsed.tab)?;
        let tab = inner
            .tabs
            .get_mut(&parsed.tab)
            .ok_or_else(|| SheetError::SheetNotFound(parsed.tab.clone()))?;

        let offset = parsed.start_col.unwrap_or(0);
        while tab.rows.last().is_some_and(|r| r.iter().all(|c| c.is_empty())) {
            tab.rows.pop();
        }
        for row in rows {
            let mut padded = vec![String::new(); offset];
            padded.extend(row);
            tab.rows.push(padded);
        }
        inner.ops.push(format!("append {range}"));
        Ok(())
    }

    async fn update_range(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        _input: ValueInput,
    ) -> Result<(), SheetError> {
        let parsed = A1Range::parse(range)?;
        let mut inner = self.inner.write().await;
        Self::check_writable(&inner, &parsed.tab)?;
        let tab = inner
            .tabs
            .get_mut(&parsed.tab)
            .ok_or_else(|| SheetError::SheetNotFound(parsed.tab.clone()))?;

        let first_row = parsed.start_row.unwrap_or(0);
        let first_col = parsed.start_col.unwrap_or(0);
        for (r, values) in rows.into_iter().enumerate() {
            let target = first_row + r;
            while tab.rows.len() <= target {
                tab.rows.push(Vec::new());
            }
            let row = &mut tab.rows[target];
            for (c, value) in values.into_iter().enumerate() {
                let col = first_col + c;
                while row.len() <= col {
                    row.push(String::new());
                }
                row[col] = value;
            }
        }
        inner.ops.push(format!("update {range}"));
        Ok(())
    }

    async fn insert_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), SheetError> {
        let mut inner = self.inner.write().await;
        let name = Self::tab_for_id(&inner, sheet_id)?;
        Self::check_writable(&inner, &name)?;
        if let Some(tab) = inner.tabs.get_mut(&name) {
            while tab.rows.len() < start {
                tab.rows.push(Vec::new());
            }
            for _ in start..end {
                tab.rows.insert(start, Vec::new());
            }
        }
        inner.ops.push(format!("insert {name} {start}..{end}"));
        Ok(())
    }

    async fn delete_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), SheetError> {
        let mut inner = self.inner.write().await;
        let name = Self::tab_for_id(&inner, sheet_id)?;
        Self::check_writable(&inner, &name)?;
        if let Some(tab) = inner.tabs.get_mut(&name) {
            let end = end.min(tab.rows.len());
            if start < end {
                tab.rows.drain(start..end);
            }
        }
        inner.ops.push(format!("delete {name} {start}..{end}"));
        Ok(())
    }
}
