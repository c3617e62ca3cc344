//! A1 notation helpers: column letters and `"<tab>!A1:Z99"` range strings.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SheetError;

static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?([A-Za-z]*)\$?([0-9]*)$").expect("valid A1 cell regex")
});

/// Convert a zero-based column index to its letter (0 → A, 25 → Z, 26 → AA).
pub fn column_letter(index: usize) -> String {
    let mut result = Vec::new();
    let mut value = index + 1;
    while value > 0 {
        let rem = (value - 1) % 26;
        result.push(b'A' + rem as u8);
        value = (value - 1) / 26;
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Convert column letters back to a zero-based index (A → 0, AA → 26).
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut value = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value - 1)
}

/// `Tab!1:1`: the header row.
pub fn header_range(tab: &str) -> String {
    format!("{tab}!1:1")
}

/// `Tab!C:C`: one whole column.
pub fn column_range(tab: &str, column: usize) -> String {
    let letter = column_letter(column);
    format!("{tab}!{letter}:{letter}")
}

/// `Tab!A{n}:{last}{n}`: one row spanning `width` columns (1-based row number).
pub fn row_range(tab: &str, row_number: usize, width: usize) -> String {
    let last = column_letter(width.saturating_sub(1));
    format!("{tab}!A{row_number}:{last}{row_number}")
}

/// `Tab!A2:{last}`: every data row below the header.
pub fn data_range(tab: &str, width: usize) -> String {
    let last = column_letter(width.saturating_sub(1));
    format!("{tab}!A2:{last}")
}

/// A parsed A1 range. Bounds are zero-based and inclusive; `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub tab: String,
    pub start_col: Option<usize>,
    pub start_row: Option<usize>,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    /// Parse `Tab`, `Tab!A:Z`, `Tab!1:1`, `Tab!A2:F`, `Tab!A5:F5` or `Tab!A1`.
    pub fn parse(range: &str) -> Result<Self, SheetError> {
        let (tab, cells) = match range.split_once('!') {
            Some((tab, cells)) => (tab, Some(cells)),
            None => (range, None),
        };
        let tab = tab.trim_matches('\'').to_string();
        if tab.is_empty() {
            return Err(SheetError::InvalidRange(range.to_string()));
        }

        let Some(cells) = cells else {
            return Ok(Self {
                tab,
                start_col: None,
                start_row: None,
                end_col: None,
                end_row: None,
            });
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, end),
            None => (cells, cells),
        };
        let (start_col, start_row) = parse_cell(start, range)?;
        let (end_col, end_row) = parse_cell(end, range)?;

        Ok(Self {
            tab,
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

fn parse_cell(cell: &str, range: &str) -> Result<(Option<usize>, Option<usize>), SheetError> {
    let caps = CELL_RE
        .captures(cell)
        .ok_or_else(|| SheetError::InvalidRange(range.to_string()))?;
    let col = match caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        Some(letters) => Some(
            column_index(letters).ok_or_else(|| SheetError::InvalidRange(range.to_string()))?,
        ),
        None => None,
    };
    let row = match caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        Some(digits) => {
            let n: usize = digits
                .parse()
                .map_err(|_| SheetError::InvalidRange(range.to_string()))?;
            if n == 0 {
                return Err(SheetError::InvalidRange(range.to_string()));
            }
            Some(n - 1)
        }
        None => None,
    };
    if col.is_none() && row.is_none() {
        return Err(SheetError::InvalidRange(range.to_string()));
    }
    Ok((col, row))
}
