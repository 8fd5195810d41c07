//! BotManager - supervisor and dashboard for named bot processes
//!
//! Each bot is a child process launched from a static configuration that maps
//! a name to a start parameter. BotManager starts and stops bots, remembers
//! which ones are running across its own restarts, and tails their logs.
//!
//! # Core Concepts
//!
//! - **Derived liveness**: "running" is computed from an in-memory child
//!   handle or, for bots inherited from a previous instance, from the OS
//! - **Persisted PIDs**: every start and stop rewrites the state file, so an
//!   ungraceful exit never loses track of running bots
//! - **Bounded tails**: log views read only the end of each log file
//!
//! # Modules
//!
//! - [`registry`] - the lifecycle API the dashboard and CLI call
//! - [`state`] - persisted name -> PID mapping
//! - [`process`] - child process handles and PID signalling
//! - [`config`] - configuration types and loading
//! - [`tui`] - terminal dashboard
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod process;
pub mod registry;
pub mod state;
pub mod tui;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::{IndexError, RegistryError};
pub use process::{ProcessHandle, SpawnError, is_process_alive, terminate_pid};
pub use registry::{
    DEFAULT_TAIL_LINES, LogLines, LogView, Started, Stopped, WorkerConfig, WorkerRegistry, WorkerStatus,
};
pub use state::{StateStore, WorkerState};
