use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use board_sync::api::{AppState, board_routes};
use board_sync::board::RecordWriter;
use board_sync::config::{BoardConfig, NotifierConfig, ReminderConfig, ServerConfig, SheetsConfig};
use board_sync::notify::build_notifier;
use board_sync::reminders::{ReminderEngine, parse_cron, spawn_reminder_ticker};
use board_sync::sheets::{GoogleSheets, ServiceAccount, SheetStore, TokenSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Console logging, plus a daily file when BOARD_LOG_DIR is set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (file_layer, _log_guard) = match std::env::var("BOARD_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir.trim(), "board-sync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    let sheets_config = SheetsConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GOOGLE_SHEET_ID=... GOOGLE_CLIENT_EMAIL=... GOOGLE_PRIVATE_KEY=...");
        std::process::exit(1);
    });
    let board_config = BoardConfig::from_env();
    let reminder_config = ReminderConfig::from_env().context("reminder configuration")?;
    let notifier_config = NotifierConfig::from_env().context("email configuration")?;
    let server_config = ServerConfig::from_env().context("server configuration")?;

    eprintln!("📋 Board Sync v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Spreadsheet: {}", sheets_config.spreadsheet_id);
    eprintln!("   Service account: {}", sheets_config.client_email);
    eprintln!("   Board tab: {}", board_config.default_tab);
    eprintln!("   Audit tab: {}", board_config.audit_tab);
    eprintln!("   Email: {}", notifier_config.label());
    eprintln!(
        "   Reminder cron: {}",
        reminder_config.cron.as_deref().unwrap_or("(trigger only)")
    );
    eprintln!("   API: http://0.0.0.0:{}/api\n", server_config.port);

    let account = ServiceAccount::new(
        sheets_config.client_email.clone(),
        &sheets_config.private_key,
        sheets_config.token_uri.clone(),
    )
    .context("service account key")?;
    let store: Arc<dyn SheetStore> = Arc::new(GoogleSheets::new(
        sheets_config.api_base.clone(),
        sheets_config.spreadsheet_id.clone(),
        TokenSource::ServiceAccount(account),
    ));

    let writer = Arc::new(RecordWriter::new(Arc::clone(&store), board_config));

    // ── Reminders ─────────────────────────────────────────────────────────
    let cron_secret = reminder_config.cron_secret.clone();
    let cron_expr = reminder_config.cron.clone();
    let reminders = match build_notifier(&notifier_config).context("email sender")? {
        Some(notifier) => Some(Arc::new(ReminderEngine::new(
            Arc::clone(&store),
            notifier,
            reminder_config,
        ))),
        None => {
            tracing::warn!("No email sender configured, reminder scans disabled");
            None
        }
    };

    if let Some(expr) = cron_expr {
        let schedule = parse_cron(&expr)?;
        match &reminders {
            Some(engine) => {
                spawn_reminder_ticker(Arc::clone(engine), schedule);
                tracing::info!(cron = %expr, "Reminder ticker started");
            }
            None => tracing::warn!(cron = %expr, "Reminder cron set without an email sender, ignored"),
        }
    }

    // ── HTTP server ───────────────────────────────────────────────────────
    let state = AppState {
        store,
        writer,
        reminders,
        cron_secret,
    };
    let app = board_routes(state, &server_config.allowed_origin);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server_config.port))
        .await
        .with_context(|| format!("bind port {}", server_config.port))?;
    tracing::info!(port = server_config.port, "Board API listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
