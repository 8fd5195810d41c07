//! TUI application - key handling
//!
//! The App owns the AppState and turns key presses into state changes and
//! [`PendingAction`]s. It never touches the registry; the runner executes
//! pending actions and feeds results back into the state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, trace};

use super::state::{AppState, InteractionMode, MenuAction, PendingAction, View};

/// TUI application
#[derive(Debug, Default)]
pub struct App {
    state: AppState,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Self {
        debug!("App::new: called");
        Self { state: AppState::new() }
    }

    /// Get reference to state
    pub fn state(&self) -> &AppState {
        trace!("App::state: called");
        &self.state
    }

    /// Get mutable reference to state
    pub fn state_mut(&mut self) -> &mut AppState {
        trace!("App::state_mut: called");
        &mut self.state
    }

    /// Handle a key event
    ///
    /// Returns true if the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        debug!(?key, "App::handle_key: called");
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            debug!("App::handle_key: Ctrl+C force quit");
            self.state.should_quit = true;
            return true;
        }

        // Messages last until the next key press
        self.state.clear_status();

        match self.state.interaction_mode.clone() {
            InteractionMode::Select { action, input } => self.handle_select_key(key, action, input),
            InteractionMode::Normal => match self.state.current_view {
                View::Dashboard => self.handle_dashboard_key(key),
                View::Logs { .. } => self.handle_logs_key(key),
            },
        }
        self.state.should_quit
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') => self.open_prompt(MenuAction::Start),
            KeyCode::Char('2') => self.open_prompt(MenuAction::Stop),
            KeyCode::Char('3') => self.open_prompt(MenuAction::Logs),
            KeyCode::Char('4') => {
                debug!("App::handle_dashboard_key: start all");
                self.state.pending_action = Some(PendingAction::StartAll);
            }
            KeyCode::Char('5') => {
                debug!("App::handle_dashboard_key: stop all");
                self.state.pending_action = Some(PendingAction::StopAll);
            }
            KeyCode::Char('q') => {
                debug!("App::handle_dashboard_key: quit requested");
                self.state.should_quit = true;
            }
            _ => trace!(?key, "App::handle_dashboard_key: ignored"),
        }
    }

    /// The log view ends on `q` or Esc; the runner stops tailing immediately
    fn handle_logs_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            debug!("App::handle_logs_key: closing log view");
            self.state.close_logs();
        }
    }

    fn handle_select_key(&mut self, key: KeyEvent, action: MenuAction, input: String) {
        match key.code {
            KeyCode::Esc => {
                debug!(?action, "App::handle_select_key: cancelled");
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Enter => {
                debug!(?action, %input, "App::handle_select_key: submitted");
                self.state.interaction_mode = InteractionMode::Normal;
                self.state.pending_action = Some(match action {
                    MenuAction::Start => PendingAction::Start(input),
                    MenuAction::Stop => PendingAction::Stop(input),
                    MenuAction::Logs => PendingAction::ShowLogs(input),
                });
            }
            KeyCode::Backspace => self.state.pop_input(),
            // Several numbers are only meaningful for the log view
            KeyCode::Char(c) if c.is_ascii_digit() => self.state.push_input(c),
            KeyCode::Char(c) if action == MenuAction::Logs && (c == ' ' || c == ',') => self.state.push_input(c),
            _ => trace!(?key, "App::handle_select_key: ignored"),
        }
    }

    fn open_prompt(&mut self, action: MenuAction) {
        if self.state.workers.is_empty() {
            self.state.set_error("Please add a bot first...");
            return;
        }
        debug!(?action, "App::open_prompt: called");
        self.state.interaction_mode = InteractionMode::Select {
            action,
            input: String::new(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WorkerStatus;

    fn app_with_workers() -> App {
        let mut app = App::new();
        app.state_mut().workers = ["alpha", "beta"]
            .iter()
            .enumerate()
            .map(|(i, name)| WorkerStatus {
                index: i + 1,
                name: name.to_string(),
                start_param: format!("{}.json", name),
                running: false,
                pid: None,
                started_at: None,
            })
            .collect();
        app
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::from(code))
    }

    #[test]
    fn test_app_new() {
        let app = App::new();
        assert!(matches!(app.state().current_view, View::Dashboard));
        assert!(matches!(app.state().interaction_mode, InteractionMode::Normal));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new();
        assert!(press(&mut app, KeyCode::Char('q')));

        let mut app = App::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.handle_key(key));
    }

    #[test]
    fn test_start_prompt_flow() {
        let mut app = app_with_workers();

        press(&mut app, KeyCode::Char('1'));
        assert!(matches!(
            app.state().interaction_mode,
            InteractionMode::Select {
                action: MenuAction::Start,
                ..
            }
        ));

        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state().interaction_mode, InteractionMode::Normal);
        assert_eq!(app.state().pending_action, Some(PendingAction::Start("2".to_string())));
    }

    #[test]
    fn test_prompt_escape_cancels() {
        let mut app = app_with_workers();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('1'));
        // 'q' inside a prompt is just ignored input, not quit
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.state().interaction_mode, InteractionMode::Normal);
        assert!(app.state().pending_action.is_none());
    }

    #[test]
    fn test_logs_prompt_accepts_several_numbers() {
        let mut app = app_with_workers();
        press(&mut app, KeyCode::Char('3'));
        for c in ['1', ' ', '2'] {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state().pending_action, Some(PendingAction::ShowLogs("1 2".to_string())));
    }

    #[test]
    fn test_prompt_requires_bots() {
        let mut app = App::new();
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.state().interaction_mode, InteractionMode::Normal);
        assert!(app.state().status.as_ref().is_some_and(|s| s.is_error));
    }

    #[test]
    fn test_batch_actions() {
        let mut app = app_with_workers();
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.state().pending_action, Some(PendingAction::StartAll));

        app.state_mut().pending_action = None;
        press(&mut app, KeyCode::Char('5'));
        assert_eq!(app.state().pending_action, Some(PendingAction::StopAll));
    }

    #[test]
    fn test_logs_view_quit_returns_to_dashboard() {
        let mut app = app_with_workers();
        app.state_mut().open_logs(vec!["alpha".to_string()]);

        // 'q' leaves the log view without quitting the app
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.state().current_view, View::Dashboard);
        assert!(app.state().tailed_names().is_none());
    }

    #[test]
    fn test_status_cleared_on_key() {
        let mut app = app_with_workers();
        app.state_mut().set_error("old");
        press(&mut app, KeyCode::Char('z'));
        assert!(app.state().status.is_none());
    }
}
