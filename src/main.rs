//! hackhub-stream — live hackathon discovery across several providers.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌────────────┐ SourceEvent ┌────────────┐  Update   ┌──────────┐  draw()  ┌──────────┐
//! │  source/   │ ──────────► │ aggregator │ ────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tasks)    │  (channel)  │  (task)    │ (channel) │ (state)  │          │ (render) │
//! └────────────┘             └────────────┘           └──────────┘          └──────────┘
//!                                  ▲ Command               ▲
//!                                  └──────────────── handle_key_event()
//!                                                     ┌──────────┐
//!                                                     │ input.rs │
//!                                                     └──────────┘
//! ```
//!
//! * **`source/`** — the `StreamProvider` trait, the per-provider source
//!   task, the `Record` type and its decoder, and the SSE provider.
//! * **`aggregator`** — owns the merged newest-first list, session
//!   lifecycle and completion; persists through `store`.
//! * **`store`** — the on-disk slot holding the last aggregate.
//! * **`app`** — what the UI shows (items, status, search form, scroll).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations and commands.
//! * **`main`** — wires everything together: config, logging, runtime,
//!   terminal setup and the event loop.

mod aggregator;
mod app;
mod config;
mod error;
mod input;
mod source;
mod store;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aggregator::{Aggregator, Command};
use app::App;
use config::Config;
use source::{SseProvider, StreamProvider};
use store::JsonFileStore;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Send logs to `path`; the terminal is owned by the UI.
///
/// `RUST_LOG` overrides the default `hackhub_stream=info` filter.
fn init_tracing(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hackhub_stream=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    install_panic_hook();

    // -- configuration -------------------------------------------------------
    let mut config = Config::from_env()?;
    if let Some(url) = std::env::args().nth(1) {
        config.api_base_url = url;
    }
    init_tracing(&config.log_file)?;
    info!(api = %config.api_base_url, providers = ?config.providers, "starting");

    // -- providers and aggregator --------------------------------------------
    let client = reqwest::Client::new();
    let providers: Vec<Arc<dyn StreamProvider>> = config
        .providers
        .iter()
        .map(|id| {
            Arc::new(SseProvider::new(&config.api_base_url, id, client.clone()))
                as Arc<dyn StreamProvider>
        })
        .collect();
    let store = JsonFileStore::new(&config.store_path);
    let (aggregator, events) = Aggregator::new(providers, Box::new(store));

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let (updates_tx, mut updates) = mpsc::unbounded_channel();
    let aggregator_task = runtime.spawn(aggregator.run(commands_rx, events, updates_tx));

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(config.default_count);

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain any updates from the aggregator.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(update) = updates.try_recv() {
            app.apply_update(update);
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = input::handle_key_event(&mut app, key) {
                    info!(?command, "search requested");
                    if commands.send(command).is_err() {
                        warn!("aggregator is gone; quitting");
                        app.quit = true;
                    }
                }
            }
        }

        if app.quit {
            break;
        }
    }

    // Close any open streams before tearing the runtime down.
    let _ = commands.send(Command::Shutdown);
    if let Err(e) = runtime.block_on(aggregator_task) {
        warn!(error = %e, "aggregator task ended abnormally");
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
    info!("bye");

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
