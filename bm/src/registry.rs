//! WorkerRegistry - single source of truth for bot lifecycle
//!
//! Merges three views of a worker:
//! - the static configuration (which bots may exist and how to launch them)
//! - the persisted [`StateStore`] (which PIDs we last believed were running)
//! - in-memory [`ProcessHandle`]s for children this instance spawned
//!
//! Liveness is never stored. [`WorkerRegistry::is_running`] derives it on
//! every call, and every caller that needs it goes through that function.
//!
//! All mutating operations take `&mut self`, so the liveness check in
//! [`WorkerRegistry::start`] cannot race with another start of the same bot.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::error::{IndexError, RegistryError};
use crate::process::{ProcessHandle, is_process_alive, terminate_pid};
use crate::state::StateStore;

pub use logtail::DEFAULT_TAIL_LINES;

/// Validated, immutable launch configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    bots: BTreeMap<String, String>,
    bot_directory: PathBuf,
    program: String,
    args: Vec<String>,
    logs_dir: PathBuf,
}

impl WorkerConfig {
    /// Build from a loaded [`Config`], validating it first
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let bot_directory = config.bot_directory.clone().ok_or(ConfigError::MissingBotDirectory)?;
        let (program, args) = config.command.split_first().ok_or(ConfigError::EmptyCommand)?;

        Ok(Self {
            bots: config.bots.clone(),
            bot_directory,
            program: program.clone(),
            args: args.to_vec(),
            logs_dir: config.logs_dir.clone(),
        })
    }

    /// Bot names in listing order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bots.keys().map(String::as_str)
    }

    /// Start parameter for a bot
    pub fn start_param(&self, name: &str) -> Option<&str> {
        self.bots.get(name).map(String::as_str)
    }

    /// Number of configured bots
    pub fn len(&self) -> usize {
        self.bots.len()
    }

    /// True when no bots are configured
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    pub fn bot_directory(&self) -> &Path {
        &self.bot_directory
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }
}

/// One row of the worker listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    /// 1-based position in the listing
    pub index: usize,
    pub name: String,
    pub start_param: String,
    pub running: bool,
    /// PID when running
    pub pid: Option<u32>,
    /// Launch time when running and known
    pub started_at: Option<DateTime<Utc>>,
}

/// Result of a successful start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub name: String,
    pub pid: u32,
}

/// Result of a successful stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopped {
    pub name: String,
    pub pid: u32,
    /// True when the worker was inherited from a previous supervisor
    pub orphan: bool,
}

/// Tail of one worker's log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLines {
    Lines(Vec<String>),
    /// The worker has never written a log file
    NoLogYet,
    /// The log exists but couldn't be read
    Error(String),
}

/// Log pane data for one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogView {
    pub running: bool,
    pub lines: LogLines,
}

/// Bot lifecycle registry
#[derive(Debug)]
pub struct WorkerRegistry {
    config: WorkerConfig,
    store: StateStore,
    /// Children spawned by this instance, keyed by bot name
    handles: HashMap<String, ProcessHandle>,
    /// Terminated children not yet reaped
    draining: Vec<ProcessHandle>,
}

impl WorkerRegistry {
    /// Create a registry, dropping persisted entries for bots no longer configured
    pub fn new(config: WorkerConfig, mut store: StateStore) -> Self {
        debug!(bots = config.len(), state_file = %store.path().display(), "WorkerRegistry::new: called");
        let unknown: Vec<(String, u32)> = store
            .entries()
            .iter()
            .filter(|(name, _)| !config.bots.contains_key(*name))
            .map(|(name, state)| (name.clone(), state.pid))
            .collect();
        for (name, pid) in &unknown {
            warn!(name = %name, pid, "Bot is no longer configured; it will not be tracked");
        }
        if !unknown.is_empty() {
            store.retain(|name, _| config.bots.contains_key(name));
        }

        Self {
            config,
            store,
            handles: HashMap::new(),
            draining: Vec::new(),
        }
    }

    /// Validate the config and load persisted state from its state file
    pub fn open(config: &Config) -> Result<Self, ConfigError> {
        let worker_config = WorkerConfig::from_config(config)?;
        let store = StateStore::load(&config.state_file);
        Ok(Self::new(worker_config, store))
    }

    /// The launch configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Log file for a bot: `<logs-dir>/<name>.log`
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.config.logs_dir().join(format!("{}.log", name))
    }

    /// Whether a bot is currently running
    ///
    /// An in-memory handle is authoritative when present. Otherwise a
    /// persisted PID counts if the OS still has a process with that id.
    pub fn is_running(&mut self, name: &str) -> bool {
        if let Some(handle) = self.handles.get_mut(name) {
            return handle.is_running();
        }
        self.store.get(name).is_some_and(|state| is_process_alive(state.pid))
    }

    /// One reconciliation cycle
    ///
    /// Reaps terminated children and forgets workers whose process has gone.
    /// Returns the names found to have exited.
    pub fn reap(&mut self) -> Vec<String> {
        self.draining.retain_mut(|handle| {
            let alive = handle.is_running();
            if !alive {
                debug!(name = handle.name(), pid = handle.pid(), "WorkerRegistry::reap: stopped bot exited");
            }
            alive
        });

        let tracked: Vec<String> = self
            .store
            .entries()
            .keys()
            .chain(self.handles.keys())
            .cloned()
            .collect();

        let mut exited = Vec::new();
        for name in tracked {
            if exited.contains(&name) || self.is_running(&name) {
                continue;
            }
            info!(name = %name, "Bot is no longer running");
            self.forget(&name);
            exited.push(name);
        }
        exited
    }

    /// Sorted listing with derived liveness
    pub fn list(&mut self) -> Vec<WorkerStatus> {
        self.reap();

        let bots: Vec<(String, String)> = self
            .config
            .bots
            .iter()
            .map(|(name, param)| (name.clone(), param.clone()))
            .collect();

        bots.into_iter()
            .enumerate()
            .map(|(i, (name, start_param))| {
                let running = self.is_running(&name);
                let state = self.store.get(&name).filter(|_| running);
                WorkerStatus {
                    index: i + 1,
                    pid: state.map(|s| s.pid),
                    started_at: state.and_then(|s| s.started_at),
                    name,
                    start_param,
                    running,
                }
            })
            .collect()
    }

    /// Map a 1-based `#` selection to a bot name
    pub fn resolve_index(&self, input: &str) -> Result<String, IndexError> {
        let trimmed = input.trim();
        let index: i64 = trimmed
            .parse()
            .map_err(|_| IndexError::NotANumber(trimmed.to_string()))?;
        if index <= 0 {
            return Err(IndexError::NotPositive(index));
        }

        let len = self.config.len();
        let index = usize::try_from(index).map_err(|_| IndexError::OutOfRange { index: usize::MAX, len })?;
        self.config
            .names()
            .nth(index - 1)
            .map(str::to_string)
            .ok_or(IndexError::OutOfRange { index, len })
    }

    /// Resolve either a bot name or a `#` selection
    pub fn resolve(&self, target: &str) -> Result<String, RegistryError> {
        if self.config.bots.contains_key(target) {
            return Ok(target.to_string());
        }
        if target.trim().parse::<i64>().is_ok() {
            return Ok(self.resolve_index(target)?);
        }
        Err(RegistryError::UnknownWorker(target.to_string()))
    }

    /// Launch a bot
    pub fn start(&mut self, name: &str) -> Result<Started, RegistryError> {
        debug!(name, "WorkerRegistry::start: called");
        let start_param = self
            .config
            .start_param(name)
            .ok_or_else(|| RegistryError::UnknownWorker(name.to_string()))?
            .to_string();

        if self.is_running(name) {
            debug!(name, "WorkerRegistry::start: already running");
            return Err(RegistryError::AlreadyRunning(name.to_string()));
        }
        // Clear anything stale so a failed spawn leaves the bot absent
        self.forget(name);

        let mut args = self.config.args.clone();
        args.push(start_param);
        let log_path = self.log_path(name);

        let handle = ProcessHandle::spawn(name, &self.config.program, &args, &self.config.bot_directory, &log_path)?;
        let pid = handle.pid();

        self.store.upsert(name, pid);
        self.handles.insert(name.to_string(), handle);

        info!(name, pid, "Bot started");
        Ok(Started {
            name: name.to_string(),
            pid,
        })
    }

    /// Send a bot SIGTERM and forget it
    ///
    /// A process that disappears before the signal lands counts as stopped.
    pub fn stop(&mut self, name: &str) -> Result<Stopped, RegistryError> {
        debug!(name, "WorkerRegistry::stop: called");
        if !self.config.bots.contains_key(name) {
            return Err(RegistryError::UnknownWorker(name.to_string()));
        }

        if !self.is_running(name) {
            debug!(name, "WorkerRegistry::stop: not running");
            self.forget(name);
            return Err(RegistryError::NotRunning(name.to_string()));
        }

        let stopped = if let Some(mut handle) = self.handles.remove(name) {
            let pid = handle.pid();
            if let Err(source) = handle.terminate() {
                self.handles.insert(name.to_string(), handle);
                return Err(RegistryError::Signal {
                    name: name.to_string(),
                    pid,
                    source,
                });
            }
            self.draining.push(handle);
            Stopped {
                name: name.to_string(),
                pid,
                orphan: false,
            }
        } else {
            let pid = self
                .store
                .get(name)
                .map(|state| state.pid)
                .ok_or_else(|| RegistryError::NotRunning(name.to_string()))?;
            terminate_pid(pid).map_err(|source| RegistryError::Signal {
                name: name.to_string(),
                pid,
                source,
            })?;
            Stopped {
                name: name.to_string(),
                pid,
                orphan: true,
            }
        };

        self.store.remove(name);
        info!(name, pid = stopped.pid, orphan = stopped.orphan, "Bot stopped");
        Ok(stopped)
    }

    /// Start every bot that isn't running, in listing order
    pub fn start_all(&mut self) -> Vec<(String, Result<Started, RegistryError>)> {
        let idle: Vec<String> = self.list().into_iter().filter(|w| !w.running).map(|w| w.name).collect();
        debug!(?idle, "WorkerRegistry::start_all: called");
        idle.into_iter()
            .map(|name| {
                let result = self.start(&name);
                (name, result)
            })
            .collect()
    }

    /// Stop every running bot, in listing order
    pub fn stop_all(&mut self) -> Vec<(String, Result<Stopped, RegistryError>)> {
        let running: Vec<String> = self.list().into_iter().filter(|w| w.running).map(|w| w.name).collect();
        debug!(?running, "WorkerRegistry::stop_all: called");
        running
            .into_iter()
            .map(|name| {
                let result = self.stop(&name);
                (name, result)
            })
            .collect()
    }

    /// Last `lines` log lines for each named bot
    ///
    /// Bots without a log file yet map to [`LogLines::NoLogYet`]. Names not in
    /// the configuration are skipped.
    pub fn tail_logs(&mut self, names: &[String], lines: usize) -> BTreeMap<String, LogView> {
        let mut views = BTreeMap::new();
        for name in names {
            if !self.config.bots.contains_key(name) {
                debug!(name = %name, "WorkerRegistry::tail_logs: unknown bot, skipping");
                continue;
            }

            let running = self.is_running(name);
            let tail = match logtail::tail_lines(self.log_path(name), lines) {
                Ok(lines) => LogLines::Lines(lines),
                Err(e) if e.is_no_log_yet() => LogLines::NoLogYet,
                Err(e) => {
                    warn!(name = %name, error = %e, "Failed to tail bot log");
                    LogLines::Error(e.to_string())
                }
            };
            views.insert(name.clone(), LogView { running, lines: tail });
        }
        views
    }

    /// Drop the handle and persisted entry for a bot
    fn forget(&mut self, name: &str) {
        if let Some(mut handle) = self.handles.remove(name)
            && handle.is_running()
        {
            self.draining.push(handle);
        }
        self.store.remove(name);
    }
}
