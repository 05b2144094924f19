//! basemark: edit a project's files and commit them against stored baselines.
//!
//! Entry point for the `basemark` binary. Wires together configuration
//! (`config`), logging, the SQLite-backed store (`basemark-core`), the terminal
//! lifecycle (`tui`), the unified event bus (`event`), and rendering (`ui`).
//!
//! # Startup sequence
//!
//! 1. Parse args, start file logging, load config. Nothing here touches the
//!    terminal, so errors print normally.
//! 2. Open the store, find or create the project, optionally import a
//!    directory, load files and baselines.
//! 3. `install_panic_hook()`, then `register_sigterm()`, then `init_tui()`.
//! 4. Create the event channel and `spawn_event_task()`.
//!
//! `restore_tui()` is called after the event loop exits (quit key, SIGTERM,
//! or channel close), and pending edits are written back before the process
//! ends.

mod app;
mod config;
mod event;
mod suggest_http;
mod theme;
mod tui;
mod ui;

use std::fs::File;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use basemark_core::db::SqliteStore;
use basemark_core::debounce;
use basemark_core::import::import_directory;
use basemark_core::staging::CommitRequest;
use basemark_core::store::{BaselineStore, DocumentStore};
use basemark_core::suggest::{self, SuggestionSource};
use basemark_core::types::{baseline_map, Identity};
use basemark_core::workspace::SaveRequest;
use clap::Parser;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::AppState;
use config::{Config, SuggestionConfig};
use event::AppEvent;
use suggest_http::HttpSuggestionSource;
use ui::keybindings::KeyAction;

const STATE_DIR: &str = ".basemark";

#[derive(Debug, Parser)]
#[command(name = "basemark", version, about = "Edit files and commit them against stored baselines")]
struct Args {
    /// Database file; overrides `database` from config.toml.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Project to open; created when it does not exist yet.
    #[arg(long, default_value = "default")]
    project: String,

    /// Identity that owns the project. Defaults to $USER.
    #[arg(long)]
    owner: Option<String>,

    /// Import a directory tree into the project before starting.
    #[arg(long, value_name = "DIR")]
    import: Option<PathBuf>,
}

/// Sends logs to a file, since the TUI owns the terminal. The filter comes
/// from `BASEMARK_LOG` (e.g. `BASEMARK_LOG=basemark_core=debug`) and
/// defaults to `info`.
fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::options().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env("BASEMARK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .try_init()
        .map_err(io::Error::other)
}

/// Builds the suggestion source, or `None` when suggestions are disabled or
/// no endpoint is configured.
fn suggestion_source(config: &SuggestionConfig) -> Option<Arc<dyn SuggestionSource>> {
    if !config.enabled {
        return None;
    }
    let endpoint = config.endpoint.as_deref()?;
    match HttpSuggestionSource::new(endpoint) {
        Ok(source) => Some(Arc::new(source)),
        Err(e) => {
            warn!(error = %e, "suggestions disabled");
            None
        }
    }
}

/// Everything the event loop needs besides `AppState`.
struct Services {
    store: SqliteStore,
    tx: UnboundedSender<AppEvent>,
    suggestions: Option<Arc<dyn SuggestionSource>>,
    save_debounce: Duration,
    suggestion_debounce: Duration,
}

/// Writes content back to the store, retrying earlier failures too. Failed
/// content is kept and shown in the status bar. Returns whether every write
/// succeeded.
async fn write_saves(state: &mut AppState, store: &SqliteStore, saves: Vec<SaveRequest>) -> bool {
    let saves = state.with_unsaved(saves);
    if saves.is_empty() {
        return true;
    }
    let mut all_saved = true;
    for save in saves {
        match store.patch_content(&state.identity, &save.file_id, &save.content).await {
            Ok(()) => state.apply_save(&save),
            Err(e) => {
                error!(file = %save.file_id, error = %e, "save failed");
                state.set_error(format!("save failed: {e}"));
                state.keep_unsaved(save);
                all_saved = false;
            }
        }
    }
    state.recompute_changes();
    all_saved
}

/// Saves every dirty document, commits the staged files, then rebases open
/// documents onto the new baselines. Skipped entirely when any save fails.
async fn run_commit(state: &mut AppState, store: &SqliteStore, request: CommitRequest) {
    let saves = state.workspace.flush_saves();
    if !write_saves(state, store, saves).await {
        warn!("commit skipped, unsaved edits");
        state.set_error("commit aborted: unsaved edits could not be written");
        return;
    }

    let result = state
        .staging
        .commit(store, &state.identity, &state.project.id, &state.files, &state.baselines)
        .await;
    match result {
        Ok(0) => state.set_error("nothing staged to commit"),
        Ok(count) => {
            match store.get_all(&state.identity, &state.project.id).await {
                Ok(rows) => {
                    state.baselines = baseline_map(rows);
                    state.workspace.rebase(&state.baselines);
                }
                Err(e) => error!(error = %e, "reloading baselines after commit failed"),
            }
            state.recompute_changes();
            state.commit_message.clear();
            info!(count, message = request.message(), "committed");
            state.set_status(format!("committed {count} file(s): {}", request.message()));
        }
        Err(e) => {
            error!(error = %e, "commit failed");
            state.set_error(format!("commit failed: {e}"));
        }
    }
}

/// Carries out the follow-up work of a key or mouse event.
async fn perform(action: KeyAction, state: &mut AppState, services: &Services) -> ControlFlow<()> {
    match action {
        KeyAction::Continue => {}
        KeyAction::Quit => return ControlFlow::Break(()),
        KeyAction::Edited(effects) => {
            if let Some(ticket) = effects.save {
                let due = AppEvent::SaveDue { file_id: effects.file_id.clone(), generation: ticket.generation };
                debounce::spawn_delayed(ticket, services.save_debounce, services.tx.clone(), due);
            }
            if let (Some(request), Some(source)) = (effects.suggestion, &services.suggestions) {
                suggest::spawn_fetch(
                    Arc::clone(source),
                    request.file_id,
                    request.ticket,
                    request.context,
                    services.suggestion_debounce,
                    services.tx.clone(),
                );
            }
            state.recompute_changes();
        }
        KeyAction::Save(saves) => {
            write_saves(state, &services.store, saves).await;
        }
        KeyAction::Commit(request) => run_commit(state, &services.store, request).await,
    }
    ControlFlow::Continue(())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(STATE_DIR)?;
    init_logging(&Path::new(STATE_DIR).join("basemark.log"))?;
    let config = Config::load();
    let theme = theme::Theme::from_name(&config.theme);

    let db_path = args.db.unwrap_or_else(|| config.database.clone());
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::open(&db_path.to_string_lossy()).await.map_err(io::Error::other)?;

    let owner = args.owner.or_else(|| std::env::var("USER").ok()).unwrap_or_else(|| "local".to_owned());
    let identity = Identity::new(owner);
    let project = match store.find_project(&identity, &args.project).await.map_err(io::Error::other)? {
        Some(project) => project,
        None => store.create_project(&identity, &args.project).await.map_err(io::Error::other)?,
    };
    if let Some(dir) = &args.import {
        import_directory(&store, &identity, &project.id, dir).await.map_err(io::Error::other)?;
    }
    let files = store.list_by_project(&identity, &project.id).await.map_err(io::Error::other)?;
    let baselines = baseline_map(store.get_all(&identity, &project.id).await.map_err(io::Error::other)?);
    info!(project = %project.name, files = files.len(), baselines = baselines.len(), "project loaded");

    let suggestions = suggestion_source(&config.suggestion);
    let mut state = AppState::new(identity, project, files, baselines, config.tabs.preview);
    state.workspace.set_suggestions_enabled(suggestions.is_some());
    ui::highlight::warm_up();

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;
    let services = Services {
        store,
        tx: handler.tx,
        suggestions,
        save_debounce: config.save_debounce(),
        suggestion_debounce: config.suggestion.debounce(),
    };

    // Exits only via `break`, never via `?` outside the Render arm, so
    // `restore_tui()` is always reached.
    'event_loop: loop {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50ms even when no
            // other event arrives.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                let action = match maybe_event {
                    Some(AppEvent::Render) => {
                        // Exactly one draw() call per Render event.
                        terminal.draw(|frame| ui::render(frame, &mut state, &theme))?;
                        KeyAction::Continue
                    }
                    Some(AppEvent::Key(key)) => ui::keybindings::handle_key(key, &mut state),
                    Some(AppEvent::Mouse(mouse)) => ui::keybindings::handle_mouse(mouse, &mut state),
                    Some(AppEvent::SaveDue { file_id, generation }) => {
                        let due = state.workspace.take_due_save(&file_id, generation);
                        KeyAction::Save(due.into_iter().collect())
                    }
                    Some(AppEvent::Suggestion(ready)) => {
                        state.workspace.resolve_suggestion(ready);
                        KeyAction::Continue
                    }
                    // Resize is picked up by the next Render through frame.area().
                    Some(AppEvent::Resize(_, _)) => KeyAction::Continue,
                    None => break 'event_loop,
                };
                if perform(action, &mut state, &services).await.is_break() {
                    break 'event_loop;
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    tui::restore_tui()?;

    let pending = state.workspace.flush_saves();
    if !pending.is_empty() {
        info!(count = pending.len(), "saving pending edits before exit");
    }
    if !write_saves(&mut state, &services.store, pending).await {
        let lost: Vec<_> = state.unsaved.iter().map(|s| s.file_id.to_string()).collect();
        error!(files = ?lost, "exiting with unsaved edits");
        eprintln!("basemark: could not save {}", lost.join(", "));
    }
    Ok(())
}
