//! TUI application state
//!
//! Pure data structures for the dashboard. No rendering logic and no
//! terminal or registry handles live here.

use std::collections::BTreeMap;

use tracing::debug;

use crate::registry::{LogView, WorkerStatus};

/// Longest selection a prompt accepts
const MAX_INPUT_LEN: usize = 64;

/// Which view is currently displayed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    /// Bot table and menu
    #[default]
    Dashboard,
    /// Live tail of one or more bot logs
    Logs { names: Vec<String> },
}

impl View {
    /// Breadcrumb suffix for the header
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Dashboard => "Bots",
            Self::Logs { .. } => "Bot Log",
        }
    }
}

/// Menu entries that need a bot number before they can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Start,
    Stop,
    Logs,
}

impl MenuAction {
    /// Title shown while the prompt is open
    pub fn title(self) -> &'static str {
        match self {
            Self::Start => "Start a bot",
            Self::Stop => "Stop a bot",
            Self::Logs => "Show Logs",
        }
    }
}

/// Current input mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Menu keys
    #[default]
    Normal,
    /// Typing a bot number for a menu action
    Select { action: MenuAction, input: String },
}

/// Request for the runner, which owns the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Start(String),
    Stop(String),
    /// Raw selection, possibly several numbers separated by spaces or commas
    ShowLogs(String),
    StartAll,
    StopAll,
}

/// Message shown in the footer until the next key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Complete dashboard state
#[derive(Debug, Default)]
pub struct AppState {
    pub current_view: View,
    pub interaction_mode: InteractionMode,
    /// Latest listing from the registry
    pub workers: Vec<WorkerStatus>,
    /// Latest log tails, only populated while the log view is open
    pub log_views: BTreeMap<String, LogView>,
    /// Working directory shown in the header
    pub bot_directory: String,
    pub status: Option<StatusMessage>,
    pub pending_action: Option<PendingAction>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        debug!("AppState::new: called");
        Self::default()
    }

    /// Show an informational message
    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: msg.into(),
            is_error: false,
        });
    }

    /// Show an error message
    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: msg.into(),
            is_error: true,
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Number of running bots in the latest listing
    pub fn running_count(&self) -> usize {
        self.workers.iter().filter(|w| w.running).count()
    }

    /// Names whose logs should be tailed, if the log view is open
    pub fn tailed_names(&self) -> Option<&[String]> {
        match &self.current_view {
            View::Logs { names } => Some(names.as_slice()),
            View::Dashboard => None,
        }
    }

    /// Open the log view for the given bots
    pub fn open_logs(&mut self, names: Vec<String>) {
        debug!(?names, "AppState::open_logs: called");
        self.current_view = View::Logs { names };
    }

    /// Leave the log view; no further tail cycles run after this
    pub fn close_logs(&mut self) {
        debug!("AppState::close_logs: called");
        self.current_view = View::Dashboard;
        self.log_views.clear();
    }

    /// Append a character to the open prompt
    pub fn push_input(&mut self, c: char) {
        if let InteractionMode::Select { input, .. } = &mut self.interaction_mode
            && input.len() < MAX_INPUT_LEN
        {
            input.push(c);
        }
    }

    /// Remove the last character from the open prompt
    pub fn pop_input(&mut self) {
        if let InteractionMode::Select { input, .. } = &mut self.interaction_mode {
            input.pop();
        }
    }
}

/// Split a log selection like "1 3" or "1,3" into individual entries
pub fn split_selection(input: &str) -> Vec<&str> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}
