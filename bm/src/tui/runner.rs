//! TUI Runner - main loop that owns the terminal and the registry
//!
//! The TuiRunner is responsible for:
//! - Dispatching events to App for handling
//! - Executing pending actions against the WorkerRegistry
//! - Refreshing the listing and open log tails once per refresh interval

use std::collections::HashSet;
use std::time::{Duration, Instant};

use eyre::Result;
use tracing::{debug, info, warn};

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::state::{PendingAction, split_selection};
use super::views;
use crate::registry::{DEFAULT_TAIL_LINES, WorkerRegistry};

/// Input poll rate; refreshes happen on the first tick after the interval
const TICK_RATE: Duration = Duration::from_millis(100);

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner {
    app: App,
    terminal: Tui,
    registry: WorkerRegistry,
    event_handler: EventHandler,
    refresh_interval: Duration,
    last_refresh: Instant,
}

impl TuiRunner {
    /// Create a runner that refreshes every `refresh_interval`
    pub fn new(terminal: Tui, registry: WorkerRegistry, refresh_interval: Duration) -> Self {
        debug!(?refresh_interval, "TuiRunner::new: called");
        let mut app = App::new();
        app.state_mut().bot_directory = registry.config().bot_directory().display().to_string();

        Self {
            app,
            terminal,
            registry,
            event_handler: EventHandler::new(TICK_RATE.min(refresh_interval)),
            refresh_interval,
            last_refresh: Instant::now(),
        }
    }

    /// Run until the user exits
    pub async fn run(&mut self) -> Result<()> {
        debug!("TuiRunner::run: called");
        self.refresh();

        loop {
            self.terminal.draw(|frame| views::render(self.app.state(), frame))?;

            match self.event_handler.next().await? {
                Event::Tick => {
                    if self.last_refresh.elapsed() >= self.refresh_interval {
                        self.refresh();
                    }
                }
                Event::Key(key) => {
                    if self.app.handle_key(key) {
                        break;
                    }
                    if let Some(action) = self.app.state_mut().pending_action.take() {
                        self.execute_action(action);
                        self.refresh();
                    }
                }
                Event::Resize(width, height) => {
                    debug!(width, height, "TuiRunner::run: resize");
                }
            }

            if self.app.state().should_quit {
                break;
            }
        }

        debug!("TuiRunner::run: exiting");
        Ok(())
    }

    /// Pull a fresh listing and, while the log view is open, fresh tails
    fn refresh(&mut self) {
        let workers = self.registry.list();
        let names = self.app.state().tailed_names().map(<[String]>::to_vec);
        let log_views = names
            .map(|names| self.registry.tail_logs(&names, DEFAULT_TAIL_LINES))
            .unwrap_or_default();

        let state = self.app.state_mut();
        state.workers = workers;
        state.log_views = log_views;
        self.last_refresh = Instant::now();
    }

    fn execute_action(&mut self, action: PendingAction) {
        info!(?action, "Executing dashboard action");
        match action {
            PendingAction::Start(input) => {
                let result = self
                    .registry
                    .resolve_index(&input)
                    .map_err(Into::into)
                    .and_then(|name| self.registry.start(&name));
                match result {
                    Ok(started) => self
                        .app
                        .state_mut()
                        .set_message(format!("Started {} (pid {})", started.name, started.pid)),
                    Err(e) => self.report_error(&e),
                }
            }
            PendingAction::Stop(input) => {
                let result = self
                    .registry
                    .resolve_index(&input)
                    .map_err(Into::into)
                    .and_then(|name| self.registry.stop(&name));
                match result {
                    Ok(stopped) => self
                        .app
                        .state_mut()
                        .set_message(format!("Stopped {} (pid {})", stopped.name, stopped.pid)),
                    Err(e) => self.report_error(&e),
                }
            }
            PendingAction::ShowLogs(input) => {
                let selection = split_selection(&input);
                if selection.is_empty() {
                    self.app.state_mut().set_error("Enter at least one bot number");
                    return;
                }
                let names: Result<Vec<String>, _> =
                    selection.iter().map(|entry| self.registry.resolve_index(entry)).collect();
                match names {
                    Ok(mut names) => {
                        let mut seen = HashSet::new();
                        names.retain(|name| seen.insert(name.clone()));
                        self.app.state_mut().open_logs(names);
                    }
                    Err(e) => self.app.state_mut().set_error(e.to_string()),
                }
            }
            PendingAction::StartAll => {
                let results = self.registry.start_all();
                let summary = summarize(results.iter().map(|(name, r)| (name, r.as_ref().err())), "Started");
                self.app.state_mut().set_message(summary);
            }
            PendingAction::StopAll => {
                let results = self.registry.stop_all();
                let summary = summarize(results.iter().map(|(name, r)| (name, r.as_ref().err())), "Stopped");
                self.app.state_mut().set_message(summary);
            }
        }
    }

    fn report_error(&mut self, e: &crate::error::RegistryError) {
        if !e.is_expected() {
            warn!(error = %e, "Dashboard action failed");
        }
        self.app.state_mut().set_error(e.to_string());
    }
}

/// One-line summary of a batch operation
fn summarize<'a, E: std::fmt::Display + 'a>(
    results: impl Iterator<Item = (&'a String, Option<&'a E>)>,
    verb: &str,
) -> String {
    let mut ok = 0;
    let mut failed = Vec::new();
    for (name, err) in results {
        match err {
            None => ok += 1,
            Some(e) => failed.push(format!("{}: {}", name, e)),
        }
    }

    match (ok, failed.is_empty()) {
        (0, true) => "Nothing to do".to_string(),
        (_, true) => format!("{} {} bot(s)", verb, ok),
        _ => format!("{} {} bot(s); failed: {}", verb, ok, failed.join(", ")),
    }
}
