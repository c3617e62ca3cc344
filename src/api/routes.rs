//! REST endpoints for the board.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
    routing::get,
    routing::post,
};
use chrono::{SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::board::schema::{build_header_index, cell, value_text};
use crate::board::{RecordWriter, WriteOutcome, WriteRequest};
use crate::error::{ConfigError, Error};
use crate::reminders::ReminderEngine;
use crate::sheets::{SheetStore, ValueInput};

/// Table read by `get-rows` when a `startDate` filter is given.
const PENDING_HIRES_TAB: &str = "PendingHires";
const PING_RANGE: &str = "PingTest!A1";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SheetStore>,
    pub writer: Arc<RecordWriter>,
    /// `None` when no email sender is configured.
    pub reminders: Option<Arc<ReminderEngine>>,
    /// Required as `?secret=` by the reminder trigger when set.
    pub cron_secret: Option<SecretString>,
}

/// Build the router with every board route, CORS and request tracing.
pub fn board_routes(state: AppState, allowed_origin: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/write-row", post(write_row))
        .route("/api/get-rows", get(get_rows))
        .route("/api/sheets", get(read_sheet).post(append_sheet))
        .route("/api/task-cron", get(task_cron))
        .route("/api/ping-sheet", get(ping_sheet).post(ping_sheet))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origin)),
        )
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!(origin = %allowed_origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

fn error_response(route: &str, err: &Error) -> (StatusCode, Json<Value>) {
    let status = err.status_code();
    if status.is_server_error() {
        error!(route = %route, error = %err, "Request failed");
    } else {
        warn!(route = %route, error = %err, "Request rejected");
    }
    (status, Json(json!({"ok": false, "error": err.to_string()})))
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"ok": false, "error": message})),
    )
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "board-sync"
    }))
}

// ── Record writes ───────────────────────────────────────────────────────

async fn write_row(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => return bad_request(&format!("Invalid JSON body: {e}")),
    };

    let result = match WriteRequest::from_payload(payload) {
        Ok(request) => state.writer.write(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(WriteOutcome::Written { id }) => (StatusCode::OK, Json(json!({"ok": true, "id": id}))),
        Ok(WriteOutcome::Deleted { .. }) => {
            (StatusCode::OK, Json(json!({"ok": true, "deleted": true})))
        }
        Ok(WriteOutcome::Skipped { .. }) => {
            (StatusCode::OK, Json(json!({"ok": true, "skipped": true})))
        }
        Err(e) => error_response("write-row", &e),
    }
}

// ── Board reads ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRowsQuery {
    start_date: Option<String>,
}

/// Output field → normalized header keys it is read from.
const ROW_FIELDS: &[(&str, &[&str])] = &[
    ("id", &["id"]),
    ("client", &["client", "clientname"]),
    ("recruiter", &["recruiter"]),
    ("candidate", &["candidate", "candidatename"]),
    ("stage", &["stage"]),
    ("stageDate", &["stagedate"]),
    ("businessLine", &["businessline"]),
    ("risk", &["risk"]),
    ("notes", &["notes"]),
    ("createdAt", &["createdat"]),
    ("updatedAt", &["updatedat"]),
];

async fn get_rows(
    State(state): State<AppState>,
    Query(query): Query<GetRowsQuery>,
) -> impl IntoResponse {
    let tab = match query.start_date.as_deref() {
        Some(date) if !date.is_empty() => PENDING_HIRES_TAB.to_string(),
        _ => state.writer.config().default_tab.clone(),
    };

    let values = match state.store.read_range(&tab).await {
        Ok(values) => values,
        Err(e) => return error_response("get-rows", &Error::from(e)),
    };
    let Some((headers, rows)) = values.split_first() else {
        return (StatusCode::OK, Json(json!({"ok": true, "rows": []})));
    };

    let index = build_header_index(headers);
    let rows: Vec<Value> = rows
        .iter()
        .map(|row| {
            let object = ROW_FIELDS
                .iter()
                .map(|(field, keys)| {
                    let value = keys
                        .iter()
                        .find_map(|k| index.get(*k))
                        .map(|&column| cell(row, column).to_string())
                        .unwrap_or_default();
                    (field.to_string(), Value::String(value))
                })
                .collect();
            Value::Object(object)
        })
        .collect();

    (StatusCode::OK, Json(json!({"ok": true, "rows": rows})))
}

// ── Raw sheet passthrough ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TabQuery {
    tab: Option<String>,
}

impl TabQuery {
    fn tab(&self, state: &AppState) -> String {
        self.tab
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .unwrap_or_else(|| state.writer.config().default_tab.clone())
    }
}

async fn read_sheet(State(state): State<AppState>, Query(query): Query<TabQuery>) -> impl IntoResponse {
    let tab = query.tab(&state);
    match state.store.read_range(&format!("{tab}!A:Z")).await {
        Ok(rows) => (StatusCode::OK, Json(json!({"tab": tab, "rows": rows}))),
        Err(e) => error_response("sheets", &Error::from(e)),
    }
}

async fn append_sheet(
    State(state): State<AppState>,
    Query(query): Query<TabQuery>,
    body: String,
) -> impl IntoResponse {
    const USAGE: &str = "POST body must be an array of rows";
    let tab = query.tab(&state);

    let rows = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Array(rows)) => rows,
        Ok(Value::Object(mut body)) => match body.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => return bad_request(USAGE),
        },
        _ => return bad_request(USAGE),
    };
    if rows.is_empty() {
        return bad_request(USAGE);
    }

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Array(cells) = row else {
            return bad_request(USAGE);
        };
        values.push(cells.iter().map(value_text).collect::<Vec<_>>());
    }

    let appended = values.len();
    match state
        .store
        .append_rows(&format!("{tab}!A:Z"), values, ValueInput::Raw)
        .await
    {
        Ok(()) => {
            info!(tab = %tab, rows = appended, "Rows appended");
            (
                StatusCode::OK,
                Json(json!({"ok": true, "tab": tab, "appended": appended})),
            )
        }
        Err(e) => error_response("sheets", &Error::from(e)),
    }
}

// ── Reminder trigger ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CronQuery {
    secret: Option<String>,
}

async fn task_cron(State(state): State<AppState>, Query(query): Query<CronQuery>) -> impl IntoResponse {
    if let Some(expected) = &state.cron_secret
        && query.secret.as_deref() != Some(expected.expose_secret())
    {
        warn!("Reminder trigger called with a wrong secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"ok": false, "error": "Unauthorized"})),
        );
    }

    let Some(engine) = &state.reminders else {
        let err = Error::Config(ConfigError::MissingEnvVar("RESEND_API_KEY".into()));
        return error_response("task-cron", &err);
    };

    match engine.run_scan(Utc::now()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "sent": report.sent,
                "updated": report.updated,
                "skipped": report.skipped,
            })),
        ),
        Err(e) => error_response("task-cron", &e),
    }
}

// ── Connectivity check ──────────────────────────────────────────────────

async fn ping_sheet(State(state): State<AppState>) -> impl IntoResponse {
    let value = format!("PING {}", Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    match state
        .store
        .update_range(PING_RANGE, vec![vec![value.clone()]], ValueInput::Raw)
        .await
    {
        Ok(()) => {
            info!("Ping written");
            (StatusCode::OK, Json(json!({"ok": true, "value": value})))
        }
        Err(e) => error_response("ping-sheet", &Error::from(e)),
    }
}
