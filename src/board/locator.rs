//! Row location: identity column lookup and the composite attribute fallback.
//!
//! Positions returned here index *data rows* (header excluded): position `i`
//! is sheet row number `i + 2`.

use serde_json::{Map, Value};

use crate::board::schema::{HeaderIndex, cell, first_present};

/// Fewest attributes a composite lookup may match on.
pub const MIN_COMPOSITE_FIELDS: usize = 2;

/// Attributes usable for the composite fallback:
/// (header keys in priority order, payload aliases in priority order).
const COMPOSITE_FIELDS: &[(&[&str], &[&str])] = &[
    (&["client", "clientname"], &["client", "client_name"]),
    (&["jobtitle"], &["jobTitle", "job_title"]),
    (&["candidate", "candidatename"], &["candidate", "candidate_name"]),
    (&["recruiter"], &["recruiter"]),
    (&["businessline"], &["businessLine", "business_line"]),
];

/// One column that must equal `value` (lowercased, trimmed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupPair {
    pub column: usize,
    pub value: String,
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Find `target` in a column: exact match after trimming first, then a
/// case-insensitive match. A blank target never matches.
pub fn find_row_by_value(values: &[String], target: &str) -> Option<usize> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if let Some(position) = values.iter().position(|v| v.trim() == target) {
        return Some(position);
    }
    let lower = target.to_lowercase();
    values.iter().position(|v| v.trim().to_lowercase() == lower)
}

/// Attributes present both as a column and in the request data.
pub fn composite_lookup(data: &Map<String, Value>, index: &HeaderIndex) -> Vec<LookupPair> {
    COMPOSITE_FIELDS
        .iter()
        .filter_map(|(headers, aliases)| {
            let column = headers.iter().find_map(|h| index.get(*h).copied())?;
            let value = normalize_key(&first_present(data, aliases)?);
            (!value.is_empty()).then_some(LookupPair { column, value })
        })
        .collect()
}

/// First data row on which every pair matches. Returns `None` when fewer than
/// [`MIN_COMPOSITE_FIELDS`] pairs are available.
pub fn find_row_by_composite(rows: &[Vec<String>], pairs: &[LookupPair]) -> Option<usize> {
    if pairs.len() < MIN_COMPOSITE_FIELDS {
        return None;
    }
    rows.iter().position(|row| {
        pairs
            .iter()
            .all(|pair| normalize_key(cell(row, pair.column)) == pair.value)
    })
}
