//! Integration tests for the board REST API.
//!
//! Each test spins up an Axum server on a random port backed by the
//! in-memory spreadsheet and exercises the real HTTP contract.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use board_sync::api::{AppState, board_routes};
use board_sync::board::RecordWriter;
use board_sync::config::{BoardConfig, ReminderConfig};
use board_sync::error::NotifyError;
use board_sync::notify::{Notifier, OutboundEmail};
use board_sync::reminders::ReminderEngine;
use board_sync::sheets::{MemorySheets, SheetStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const BOARD_HEADERS: &[&str] = &[
    "ID",
    "Client",
    "Job Title",
    "Candidate",
    "Recruiter",
    "Stage",
    "Private Notes",
];

const TASK_HEADERS: &[&str] = &[
    "ID",
    "Client",
    "Candidate",
    "Job Title",
    "Recruiter",
    "Task Text",
    "Task Status",
    "Task Created At",
    "Task First Notified At",
    "Task Second Notified At",
    "Task Third Notified At",
    "Task Last Notified At",
];

/// Captures outgoing email instead of sending it.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

struct TestServer {
    port: u16,
    store: Arc<MemorySheets>,
    notifier: Arc<RecordingNotifier>,
    _recruiters: tempfile::NamedTempFile,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

/// Start an Axum server on a random port with seeded tabs.
async fn start_server(with_reminders: bool) -> TestServer {
    let store = Arc::new(MemorySheets::new());
    store
        .add_tab(
            "ActiveBoard",
            &[
                BOARD_HEADERS.to_vec(),
                vec!["r1", "Acme", "Welder", "Ann", "Jane Doe", "Screen", "likes mornings"],
            ],
        )
        .await;
    store
        .add_tab("ActivityLog", &[vec!["Timestamp", "Row ID", "Tab", "Event Type"]])
        .await;
    store
        .add_tab(
            "PendingHires",
            &[
                vec!["ID", "Client", "Candidate", "Stage Date"],
                vec!["p1", "Globex", "Bo", "2025-07-01"],
            ],
        )
        .await;
    store
        .add_tab(
            "Tasks",
            &[
                TASK_HEADERS.to_vec(),
                vec![
                    "t1",
                    "Acme",
                    "Ann",
                    "Welder",
                    "Jane Doe",
                    "Call references",
                    "open",
                    "2025-06-10T16:00:00Z",
                ],
            ],
        )
        .await;
    store.add_tab::<&str>("PingTest", &[]).await;

    let mut recruiters = tempfile::NamedTempFile::new().unwrap();
    write!(recruiters, r#"{{"Jane Doe": "jane@example.com"}}"#).unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let sheets: Arc<dyn SheetStore> = store.clone();
    let reminders = with_reminders.then(|| {
        let config = ReminderConfig {
            tab: "Tasks".into(),
            recruiters_path: recruiters.path().to_path_buf(),
            ..ReminderConfig::default()
        };
        let notifier: Arc<dyn Notifier> = notifier.clone();
        Arc::new(ReminderEngine::new(Arc::clone(&sheets), notifier, config))
    });

    let state = AppState {
        writer: Arc::new(RecordWriter::new(Arc::clone(&sheets), BoardConfig::default())),
        store: sheets,
        reminders,
        cron_secret: Some(SecretString::from("s3cret")),
    };
    let app = board_routes(state, "http://localhost:3000");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        port,
        store,
        notifier,
        _recruiters: recruiters,
    }
}

async fn post_json(url: String, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn rest_health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let resp = reqwest::get(server.url("/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "board-sync");
    })
    .await
    .expect("test timed out");
}

// ── write-row ────────────────────────────────────────────────────────

#[tokio::test]
async fn write_row_creates_record_at_top_and_logs() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({
                "row": {"client": "Initech", "candidate_name": "Cy", "recruiter": "Jane Doe"},
                "logEvents": [{"eventType": "create"}]
            }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        let id = body["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let rows = server.store.rows("ActiveBoard").await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], id);
        assert_eq!(rows[1][1], "Initech");
        assert_eq!(rows[1][3], "Cy");
        assert_eq!(rows[2][0], "r1");

        let log = server.store.rows("ActivityLog").await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[1][1], id);
        assert_eq!(log[1][7], "create");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn write_row_without_identity_generates_id() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({"candidate": "Zed", "logEvents": [{"eventType": "create"}]}),
        )
        .await;
        assert_eq!(status, 200);
        let id = body["id"].as_str().unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(server.store.rows("ActiveBoard").await[1][0], id);
        assert_eq!(server.store.rows("ActivityLog").await[1][1], id);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn write_row_patch_changes_only_named_fields() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({"mode": "patch", "id": "r1", "patch": {"stage": "Offer"}}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"ok": true, "id": "r1"}));

        let rows = server.store.rows("ActiveBoard").await;
        assert_eq!(rows[1][5], "Offer");
        assert_eq!(rows[1][6], "likes mornings");
        assert_eq!(rows[1][1], "Acme");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn write_row_patch_of_unknown_id_is_404() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({"mode": "patch", "id": "nope", "patch": {"stage": "Offer"}}),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().unwrap().contains("nope"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn write_row_delete_and_repeat_delete() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({"action": "delete", "id": "r1"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"ok": true, "deleted": true}));
        assert_eq!(server.store.rows("ActiveBoard").await.len(), 1);

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({"action": "delete", "id": "r1"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"ok": true, "skipped": true}));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn write_row_refuses_audit_deletes() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(
            server.url("/api/write-row"),
            json!({"tab": "ActivityLog", "action": "delete", "id": "x"}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["ok"], false);
        assert!(server.store.operations().await.is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn write_row_rejects_malformed_json() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let resp = reqwest::Client::new()
            .post(server.url("/api/write-row"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], false);
    })
    .await
    .expect("test timed out");
}

// ── Reads ────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_rows_maps_board_fields() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let body: Value = reqwest::get(server.url("/api/get-rows"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["ok"], true);
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "r1");
        assert_eq!(rows[0]["client"], "Acme");
        assert_eq!(rows[0]["candidate"], "Ann");
        assert_eq!(rows[0]["risk"], "");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn get_rows_with_start_date_reads_pending_hires() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let body: Value = reqwest::get(server.url("/api/get-rows?startDate=2025-07-01"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["client"], "Globex");
        assert_eq!(rows[0]["stageDate"], "2025-07-01");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sheets_read_and_append() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let body: Value = reqwest::get(server.url("/api/sheets?tab=PendingHires"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["tab"], "PendingHires");
        assert_eq!(body["rows"][1][0], "p1");

        let (status, body) = post_json(
            server.url("/api/sheets?tab=PendingHires"),
            json!({"rows": [["p2", "Umbrella", "Di", "2025-08-01"]]}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"ok": true, "tab": "PendingHires", "appended": 1}));
        assert_eq!(server.store.rows("PendingHires").await[2][1], "Umbrella");

        let (status, body) = post_json(server.url("/api/sheets"), json!({"nope": 1})).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "POST body must be an array of rows");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ping_sheet_writes_marker() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let (status, body) = post_json(server.url("/api/ping-sheet"), json!({})).await;
        assert_eq!(status, 200);
        let value = body["value"].as_str().unwrap();
        assert!(value.starts_with("PING "));
        assert_eq!(server.store.rows("PingTest").await[0][0], value);
    })
    .await
    .expect("test timed out");
}

// ── Reminder trigger ─────────────────────────────────────────────────

#[tokio::test]
async fn task_cron_requires_secret() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(true).await;

        let resp = reqwest::get(server.url("/api/task-cron?secret=wrong"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
        assert!(server.notifier.sent.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn task_cron_sends_grouped_reminder() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(true).await;

        let resp = reqwest::get(server.url("/api/task-cron?secret=s3cret"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({"ok": true, "sent": 1, "updated": 1, "skipped": 0}));

        let sent = server.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@example.com");
        assert!(sent[0].text.contains("Call references"));

        // The task was created long ago, so the third stage is the one due.
        let row = &server.store.rows("Tasks").await[1];
        assert_eq!(row[8], "");
        assert!(!row[10].is_empty());
        assert_eq!(row[10], row[11]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn task_cron_without_sender_is_config_error() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let resp = reqwest::get(server.url("/api/task-cron?secret=s3cret"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], false);
    })
    .await
    .expect("test timed out");
}
