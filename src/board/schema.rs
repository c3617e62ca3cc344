//! Header labels ↔ canonical keys, and payload ↔ row mapping.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::board::fields::aliases_for;

/// Canonical header key → zero-based column position.
pub type HeaderIndex = HashMap<String, usize>;

/// Lowercase and drop every non-alphanumeric character.
///
/// `"Job Title"`, `"job_title"` and `"JOB-TITLE"` all become `"jobtitle"`.
/// An empty result means the column is ignored.
pub fn normalize_header_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Map each normalized header to its column. A duplicate header keeps its
/// last position.
pub fn build_header_index<S: AsRef<str>>(headers: &[S]) -> HeaderIndex {
    let mut index = HeaderIndex::new();
    for (position, header) in headers.iter().enumerate() {
        let key = normalize_header_label(header.as_ref());
        if !key.is_empty() {
            index.insert(key, position);
        }
    }
    index
}

/// Render a JSON payload value as cell text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `null`, `""` and `false` count as "not provided" in a full write.
pub fn is_blank(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false)) || value.as_str() == Some("")
}

/// First non-blank value among `aliases`, as cell text.
pub fn first_present(data: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| data.get(*alias))
        .find(|v| !is_blank(v))
        .map(value_text)
}

/// Cell text at `column`, empty when the row is short.
pub fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

fn padded(existing: &[String], width: usize) -> Vec<String> {
    let mut row: Vec<String> = existing.iter().take(width).cloned().collect();
    row.resize(width, String::new());
    row
}

/// Full write: every recognized column takes the payload's value (or empty);
/// columns under unrecognized headers keep what `existing` holds.
pub fn map_payload_to_row<S: AsRef<str>>(
    headers: &[S],
    data: &Map<String, Value>,
    existing: &[String],
) -> Vec<String> {
    let mut row = padded(existing, headers.len());
    for (position, header) in headers.iter().enumerate() {
        if let Some(aliases) = aliases_for(&normalize_header_label(header.as_ref())) {
            row[position] = first_present(data, aliases).unwrap_or_default();
        }
    }
    row
}

/// Patch: only recognized columns whose aliases appear in `patch` change.
/// When several aliases are present the last one listed wins.
pub fn apply_patch_to_row<S: AsRef<str>>(
    headers: &[S],
    existing: &[String],
    patch: &Map<String, Value>,
) -> Vec<String> {
    let mut row = padded(existing, headers.len());
    for (position, header) in headers.iter().enumerate() {
        let Some(aliases) = aliases_for(&normalize_header_label(header.as_ref())) else {
            continue;
        };
        for alias in aliases {
            if let Some(value) = patch.get(*alias) {
                row[position] = value_text(value);
            }
        }
    }
    row
}
