//! Blood donation dashboard - a terminal UI over a donor/hospital document store.
//!
//! The dashboard tab shows headline metrics, hospital blood stock and a map
//! of hospitals and donors. The registration tab signs up new donors.

mod app;
mod config;
mod ui;
mod utils;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bloodbank_core::{load_snapshot, store, DataStore, PlaceholderGeocoder};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use config::Config;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name inside the cache directory
const LOG_FILE: &str = "bloodbank.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a file so they don't tear the terminal UI. The returned guard
/// must live until exit or buffered lines are lost.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = Config::log_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Initialize logging
    let _log_guard = init_tracing();
    info!("Blood donation dashboard starting");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let settings = config.store_settings()?;
    let store = store::connect(&settings).context("Failed to open the document store")?;
    info!(backend = store.backend_name(), "Document store ready");

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--dump-snapshot" {
        return dump_snapshot(store.as_ref()).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and kick off the first dashboard load
    let mut app = App::new(store, Arc::new(PlaceholderGeocoder));
    app.load_dashboard();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Blood donation dashboard shutting down");
    Ok(())
}

/// Load one dashboard snapshot and print it to stdout as JSON
async fn dump_snapshot(store: &dyn DataStore) -> Result<()> {
    eprintln!("Loading dashboard snapshot from {} store...", store.backend_name());

    let snapshot = load_snapshot(store).await;
    let json = serde_json::to_string_pretty(&snapshot)
        .context("Failed to serialize dashboard snapshot")?;
    println!("{}", json);

    eprintln!(
        "Done: {} donors, {} hospitals, {} map points",
        snapshot.metrics.donor_count,
        snapshot.metrics.hospital_count,
        snapshot.map.points().len()
    );
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
