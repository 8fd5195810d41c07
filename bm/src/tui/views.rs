//! TUI views and rendering
//!
//! Draws the dashboard from AppState. Nothing here modifies state.

use chrono::{DateTime, Utc};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};
use tracing::trace;

use super::state::{AppState, InteractionMode, View};
use crate::registry::{LogLines, LogView};

mod colors {
    use ratatui::style::Color;

    pub const RUNNING: Color = Color::Rgb(0, 255, 127); // Spring green
    pub const FAILED: Color = Color::Rgb(220, 20, 60); // Crimson
    pub const HEADER: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const KEYBIND: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const DIM: Color = Color::DarkGray;
}

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    trace!(?state.current_view, "render: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);

    match &state.current_view {
        View::Dashboard => render_bots_table(state, frame, chunks[1]),
        View::Logs { names } => render_logs_view(state, names, frame, chunks[1]),
    }

    render_footer(state, frame, chunks[2]);
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_header: called");
    let line = Line::from(vec![
        Span::styled(" BotManager", Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD)),
        Span::raw(" │ "),
        Span::styled(
            state.current_view.display_name(),
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            format!("{}/{} running", state.running_count(), state.workers.len()),
            Style::default().fg(colors::RUNNING),
        ),
        Span::raw(" │ "),
        Span::styled(state.bot_directory.clone(), Style::default().fg(colors::DIM)),
    ]);

    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_bots_table(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_bots_table: called");
    let now = Utc::now();
    let rows: Vec<Row> = state
        .workers
        .iter()
        .map(|w| {
            let (label, style) = if w.running {
                ("Running", Style::default().fg(colors::RUNNING))
            } else {
                ("", Style::default())
            };
            let pid = w.pid.filter(|_| w.running).map(|p| p.to_string()).unwrap_or_default();
            let uptime = w
                .started_at
                .filter(|_| w.running)
                .map(|t| format_uptime(t, now))
                .unwrap_or_default();

            Row::new(vec![
                w.index.to_string(),
                w.name.clone(),
                w.start_param.clone(),
                label.to_string(),
                pid,
                uptime,
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),      // #
        Constraint::Percentage(25), // Bot Name
        Constraint::Min(20),        // Config Location
        Constraint::Length(9),      // State
        Constraint::Length(8),      // PID
        Constraint::Length(10),     // Uptime
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["#", "Bot Name", "Config Location", "State", "PID", "Uptime"])
                .style(Style::default().add_modifier(Modifier::BOLD).fg(colors::HEADER)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Bots ({}) ", state.workers.len()))
                .border_style(Style::default().fg(colors::HEADER)),
        );

    frame.render_widget(table, area);

    if state.workers.is_empty() {
        render_empty_message(frame, area, "No bots configured. Add some under `bots:` in config.yml.");
    }
}

/// One pane per tailed bot, stacked vertically
fn render_logs_view(state: &AppState, names: &[String], frame: &mut Frame, area: Rect) {
    trace!(?names, "render_logs_view: called");
    if names.is_empty() {
        render_empty_message(frame, area, "No bots selected.");
        return;
    }

    let count = u32::try_from(names.len()).unwrap_or(u32::MAX);
    let constraints: Vec<Constraint> = names.iter().map(|_| Constraint::Ratio(1, count)).collect();
    let panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (name, pane) in names.iter().zip(panes.iter()) {
        render_log_pane(name, state.log_views.get(name), frame, *pane);
    }
}

fn render_log_pane(name: &str, view: Option<&LogView>, frame: &mut Frame, area: Rect) {
    let running = view.is_some_and(|v| v.running);
    let (marker, marker_color) = if running {
        ("●", colors::RUNNING)
    } else {
        ("○", colors::DIM)
    };
    let title = Line::from(vec![
        Span::raw(" "),
        Span::styled(marker, Style::default().fg(marker_color)),
        Span::raw(format!(" {} ", name)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(colors::HEADER));

    let lines: Vec<Line> = match view.map(|v| &v.lines) {
        Some(LogLines::Lines(lines)) => lines.iter().map(|l| Line::from(l.as_str())).collect(),
        Some(LogLines::NoLogYet) => {
            vec![Line::from(Span::styled("No log output yet.", Style::default().fg(colors::DIM)))]
        }
        Some(LogLines::Error(e)) => {
            vec![Line::from(Span::styled(format!("Error: {}", e), Style::default().fg(colors::FAILED)))]
        }
        None => vec![Line::from(Span::styled("Loading...", Style::default().fg(colors::DIM)))],
    };

    // Keep the newest lines visible when the pane is shorter than the tail
    let visible = area.height.saturating_sub(2);
    let scroll = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_sub(visible);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!(?state.interaction_mode, "render_footer: called");
    let content = if let InteractionMode::Select { action, input } = &state.interaction_mode {
        Line::from(vec![
            Span::styled(
                format!(" {} - ", action.title()),
                Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD),
            ),
            Span::raw("Enter bot number: "),
            Span::raw(input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled("  (Enter to confirm, Esc to cancel)", Style::default().fg(colors::DIM)),
        ])
    } else if let Some(status) = &state.status {
        let color = if status.is_error { colors::FAILED } else { colors::RUNNING };
        Line::from(Span::styled(format!(" {}", status.text), Style::default().fg(color)))
    } else {
        let keybinds: &[(&str, &str)] = match state.current_view {
            View::Dashboard => &[
                ("[1]", "Start a bot"),
                ("[2]", "Stop a bot"),
                ("[3]", "Show Logs"),
                ("[4]", "Start all"),
                ("[5]", "Stop all"),
                ("[q]", "Exit"),
            ],
            View::Logs { .. } => &[("[q]", "Back"), ("[Esc]", "Back")],
        };
        key_line(keybinds)
    };

    let footer = Paragraph::new(content).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn key_line(keybinds: &[(&str, &str)]) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for (key, action) in keybinds {
        spans.push(Span::styled(
            key.to_string(),
            Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {} ", action)));
    }
    Line::from(spans)
}

fn render_empty_message(frame: &mut Frame, area: Rect, message: &str) {
    trace!(%message, "render_empty_message: called");
    let inner = area.inner(ratatui::layout::Margin {
        horizontal: 2,
        vertical: 2,
    });

    let empty = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(ratatui::layout::Alignment::Center);

    frame.render_widget(empty, inner);
}

/// Format elapsed time for display (e.g., "45s", "1m 15s", "2h 30m", "3d 4h")
fn format_uptime(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - started_at).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins % 60)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
