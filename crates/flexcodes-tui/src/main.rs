//! Flex Codes - a terminal viewer for community gate-access codes.
//!
//! Loads the codes dataset, groups it by community and lets you filter,
//! search and collapse groups from the keyboard. `--export-html <path>`
//! writes the same grouped list as a standalone HTML page instead.

mod app;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use flexcodes_core::render::{render_groups, render_load_error, render_page};
use flexcodes_core::{filter, CollapseState, Config, JsonFileStore, Loader, TypeFilter};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState, Transport};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file written under the cache directory
const LOG_FILE: &str = "flexcodes.log";

/// Initialize file logging. The terminal belongs to the UI, so logs go to
/// `<cache_dir>/flexcodes.log`. Use RUST_LOG to control the level.
fn init_tracing(config: &Config) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

/// Options for a one-shot HTML export
#[derive(Debug, Default, PartialEq, Eq)]
struct ExportArgs {
    path: PathBuf,
    filter: Option<String>,
    query: String,
}

/// Parse `--export-html <path> [--filter <label>] [--query <text>]`.
/// Returns `None` when no export was requested.
fn parse_export_args(args: &[String]) -> Result<Option<ExportArgs>> {
    let mut iter = args.iter();
    let mut export: Option<ExportArgs> = None;
    let mut filter = None;
    let mut query = String::new();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--export-html" => {
                export = Some(ExportArgs {
                    path: PathBuf::from(value("--export-html")?),
                    ..Default::default()
                })
            }
            "--filter" => filter = Some(value("--filter")?),
            "--query" => query = value("--query")?,
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(export.map(|e| ExportArgs {
        filter,
        query,
        ..e
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _guard = init_tracing(&config);
    info!("Flex Codes starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(export) = parse_export_args(&args)? {
        return export_html(config, export).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match App::new(config) {
        Ok(mut app) => {
            app.start_load();
            run_app(&mut terminal, &mut app).await
        }
        Err(e) => Err(e),
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        error!(error = %e, "Exited with error");
        eprintln!("Error: {}", e);
    }

    info!("Flex Codes shutting down");
    Ok(())
}

/// Load the dataset once and write the grouped list as an HTML page.
/// On a failed load the page carries the load-error placeholder and the
/// error is returned.
async fn export_html(config: Config, export: ExportArgs) -> Result<()> {
    let base_url = config.base_url()?;
    let transport = Transport::connect(&config, &base_url)?;
    // One-shot export: let the worker settle so a cached copy can answer offline
    transport.register().await;
    let loader = Loader::new(transport, &base_url, config.dataset_name())?;

    let state_path = config
        .state_path()
        .unwrap_or_else(|_| PathBuf::from("./collapse.json"));
    let collapse = CollapseState::new(JsonFileStore::open(state_path));
    let type_filter = export
        .filter
        .as_deref()
        .map(TypeFilter::from_label)
        .unwrap_or_else(|| config.default_filter());

    let dataset = match loader.load().await {
        Ok(dataset) => dataset,
        Err(e) => {
            let page = render_page(
                "Flex Codes",
                "0 locations",
                "Load error",
                &render_load_error(loader.dataset_name()),
            );
            write_page(&export.path, &page)?;
            return Err(e).context("Export failed");
        }
    };

    let result = filter::apply(&dataset.records, &type_filter, &export.query);
    let page = render_page(
        "Flex Codes",
        &result.summary(),
        &dataset.status().to_string(),
        &render_groups(&result, &collapse),
    );
    write_page(&export.path, &page)?;
    eprintln!("Wrote {} to {}", result.summary(), export.path.display());
    Ok(())
}

fn write_page(path: &Path, page: &str) -> Result<()> {
    std::fs::write(path, page).with_context(|| format!("Failed to write {}", path.display()))
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
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
