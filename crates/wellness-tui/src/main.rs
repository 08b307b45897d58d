// Wellness portal entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the session cache and restore any saved session
// 4. Build the API client and speech engine
// 5. Create mpsc channels and the application state
// 6. Spawn the app loop task
// 7. Run the TUI until the user quits
// 8. Wait briefly for the app loop to wind down

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use wellness_api::HttpPortalApi;
use wellness_app::app::{self, AppState, Backends};
use wellness_app::session::SessionContext;
use wellness_app::speech;
use wellness_core::config;
use wellness_core::store::LocalStore;
use wellness_tui::tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Wellness portal starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: api={} (timeout {}s), speech={}",
        config.api.base_url, config.api.timeout_secs, config.speech.enabled
    );

    let store_path = config.store_path();
    let store_path = store_path.to_string_lossy();
    let store = LocalStore::open(&store_path).context("failed to open session cache")?;
    info!("Session cache opened at {}", store_path);

    let session = SessionContext::init(store).context("failed to restore session")?;
    match session.user() {
        Some(user) => info!("Restored session for {}", user.email),
        None => info!("No saved session"),
    }

    let api = Arc::new(HttpPortalApi::from_config(&config.api).context("failed to build API client")?);
    let speech = speech::from_config(&config.speech);

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (chat_tx, chat_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let app_state = AppState::new(&config, session, Backends::http(api), speech, chat_tx);
    for update in app_state.initial_updates() {
        ui_tx
            .send(update)
            .await
            .context("UI channel closed before startup")?;
    }

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, chat_rx, ui_tx, app_state).await {
            error!("Application loop error: {:#}", e);
        }
    });

    info!("Application ready");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {:#}", e);
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Wellness portal shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (the terminal belongs to the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("wellness.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wellness=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
