//! Google Sheets v4 REST backend for `SheetStore`.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::SheetError;
use crate::sheets::auth::TokenSource;
use crate::sheets::traits::{SheetStore, ValueInput};

/// Public Sheets API root.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Sheets API client bound to one spreadsheet.
pub struct GoogleSheets {
    client: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    tokens: TokenSource,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: Option<i64>,
    title: String,
}

impl GoogleSheets {
    pub fn new(
        api_base: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tokens: TokenSource,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    /// `{base}/{spreadsheet_id}{suffix}` followed by the given path segments.
    fn url(&self, suffix: &str, segments: &[&str]) -> Result<Url, SheetError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SheetError::Request(format!("Invalid API base URL: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SheetError::Request("API base URL cannot be a base".into()))?;
            path.pop_if_empty();
            path.push(&format!("{}{suffix}", self.spreadsheet_id));
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<reqwest::Response, SheetError> {
        let token = self.tokens.token(&self.client).await?;
        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetError::Status { status, body });
        }
        Ok(resp)
    }

    async fn batch_update(&self, request: Value) -> Result<(), SheetError> {
        let url = self.url(":batchUpdate", &[])?;
        self.send(
            Method::POST,
            url,
            Some(serde_json::json!({ "requests": [request] })),
        )
        .await?;
        Ok(())
    }
}

/// Render a cell as text (the API may return numbers or booleans).
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn dimension_range(sheet_id: i64, start: usize, end: usize) -> Value {
    serde_json::json!({
        "sheetId": sheet_id,
        "dimension": "ROWS",
        "startIndex": start,
        "endIndex": end,
    })
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn sheet_id(&self, tab: &str) -> Result<Option<i64>, SheetError> {
        let mut url = self.url("", &[])?;
        url.query_pairs_mut()
            .append_pair("ranges", tab)
            .append_pair("includeGridData", "false")
            .append_pair("fields", "sheets.properties(sheetId,title)");

        let meta: SpreadsheetMeta = self
            .send(Method::GET, url, None)
            .await?
            .json()
            .await
            .map_err(|e| SheetError::InvalidResponse(e.to_string()))?;

        Ok(meta
            .sheets
            .into_iter()
            .find(|s| s.properties.title == tab)
            .and_then(|s| s.properties.sheet_id))
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.url("", &["values", range])?;
        let body: ValueRange = self
            .send(Method::GET, url, None)
            .await?
            .json()
            .await
            .map_err(|e| SheetError::InvalidResponse(e.to_string()))?;

        debug!(range = %range, rows = body.values.len(), "Read range");
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInput,
    ) -> Result<(), SheetError> {
        let mut url = self.url("", &["values", &format!("{range}:append")])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", input.as_str());
        let count = rows.len();
        self.send(
            Method::POST,
            url,
            Some(serde_json::json!({ "values": rows })),
        )
        .await?;
        debug!(range = %range, rows = count, "Appended rows");
        Ok(())
    }

    async fn update_range(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInput,
    ) -> Result<(), SheetError> {
        let mut url = self.url("", &["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", input.as_str());
        self.send(
            Method::PUT,
            url,
            Some(serde_json::json!({ "values": rows })),
        )
        .await?;
        debug!(range = %range, "Updated range");
        Ok(())
    }

    async fn insert_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), SheetError> {
        self.batch_update(serde_json::json!({
            "insertDimension": {
                "range": dimension_range(sheet_id, start, end),
                "inheritFromBefore": false,
            }
        }))
        .await
    }

    async fn delete_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<(), SheetError> {
        self.batch_update(serde_json::json!({
            "deleteDimension": {
                "range": dimension_range(sheet_id, start, end),
            }
        }))
        .await
    }
}
