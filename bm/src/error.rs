//! Registry error types
//!
//! These are expected outcomes of operator input, shown as messages rather
//! than treated as faults. Only spawn and signal failures reflect a real
//! problem, and even those are surfaced to the operator, never retried.

use thiserror::Error;

use crate::process::SpawnError;

/// Errors from worker lifecycle operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Bot \"{0}\" is already running!")]
    AlreadyRunning(String),

    #[error("Bot \"{0}\" is not running!")]
    NotRunning(String),

    #[error("No bot named \"{0}\" in the configuration")]
    UnknownWorker(String),

    #[error("Failed to start bot: {0}")]
    Spawn(#[from] SpawnError),

    #[error("Failed to signal bot \"{name}\" (pid {pid}): {source}")]
    Signal {
        name: String,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl RegistryError {
    /// True for outcomes caused by operator input rather than a failure
    pub fn is_expected(&self) -> bool {
        !matches!(self, RegistryError::Spawn(_) | RegistryError::Signal { .. })
    }
}

/// Errors mapping a `#` selection back to a worker name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Not a valid bot number: '{0}'")]
    NotANumber(String),

    #[error("Not a valid bot number: {0}")]
    NotPositive(i64),

    #[error("No bot found with number {index} (only {len} configured)")]
    OutOfRange { index: usize, len: usize },
}
