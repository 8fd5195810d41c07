//! BotManager configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal configuration problems, reported before any UI is drawn
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bot directory not set (add `bot_directory: <path>` to the config)")]
    MissingBotDirectory,

    #[error("Launch command is empty (set `command: [program, args...]`)")]
    EmptyCommand,

    #[error("Invalid bot name '{0}': names must be non-empty and usable as a file name")]
    InvalidBotName(String),
}

/// Main BotManager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot name -> start parameter (passed as the last argument)
    pub bots: BTreeMap<String, String>,

    /// Working directory for every bot process
    pub bot_directory: Option<PathBuf>,

    /// Program and leading arguments used to launch a bot
    pub command: Vec<String>,

    /// Directory holding one `<name>.log` per bot
    pub logs_dir: PathBuf,

    /// JSON file recording running bot PIDs
    pub state_file: PathBuf,

    /// Log level for the supervisor's own log (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,

    /// Dashboard refresh and log follow interval in milliseconds
    pub refresh_ms: u64,
}

/// Base data directory: ~/.local/share/botmanager
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("botmanager")
}

fn default_command() -> Vec<String> {
    vec!["python".to_string(), "pokecli.py".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bots: BTreeMap::new(),
            bot_directory: None,
            command: default_command(),
            logs_dir: data_dir().join("logs"),
            state_file: data_dir().join("state.json"),
            log_level: None,
            refresh_ms: 1000,
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this before drawing any UI so problems are reported plainly.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match &self.bot_directory {
            Some(dir) if !dir.as_os_str().is_empty() => {}
            _ => return Err(ConfigError::MissingBotDirectory),
        }

        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }

        if let Some(name) = self.bots.keys().find(|name| !is_valid_bot_name(name)) {
            return Err(ConfigError::InvalidBotName(name.clone()));
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                return Self::load_from_file(&candidate)
                    .context(format!("Failed to load config from {}", candidate.display()));
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, ignoring every error
    ///
    /// Used before logging is initialized.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(p) => p.clone(),
            None => Self::default_paths().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Candidate locations: ./config.yml, then ~/.config/botmanager/config.yml
    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("botmanager").join("config.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Bot names become log file names, so keep them to a single path component
fn is_valid_bot_name(name: &str) -> bool {
    !name.trim().is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
