//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;

use crate::registry::WorkerStatus;

/// BotManager - supervisor for named bot processes
#[derive(Parser)]
#[command(
    name = "bm",
    version,
    about = "Start, stop, and tail named bot processes",
    after_help = "Run without a subcommand to open the interactive dashboard."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show configured bots and whether they are running
    List,

    /// Start a bot
    Start {
        /// Bot name or `#` number from `bm list`
        target: String,
    },

    /// Stop a bot
    Stop {
        /// Bot name or `#` number from `bm list`
        target: String,
    },

    /// Start every bot that isn't running
    StartAll,

    /// Stop every running bot
    StopAll,

    /// Show the end of one or more bot logs
    Logs {
        /// Bot names or `#` numbers
        #[arg(required = true)]
        targets: Vec<String>,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "10")]
        lines: usize,

        /// Keep refreshing until Ctrl+C
        #[arg(short, long)]
        follow: bool,
    },
}

/// Default path for the supervisor's own log
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    crate::config::data_dir().join("botmanager.log")
}

/// Render the worker listing as a plain-text table
///
/// Columns: `#`, bot name, config location (start parameter), state.
pub fn format_table(rows: &[WorkerStatus]) -> String {
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max("Bot Name".len());
    let param_width = rows
        .iter()
        .map(|r| r.start_param.len())
        .max()
        .unwrap_or(0)
        .max("Config Location".len());
    let index_width = rows.len().to_string().len().max(1);

    let mut out = String::new();
    out.push_str(&format!(
        "{:>iw$}  {:<nw$}  {:<pw$}  {}\n",
        "#",
        "Bot Name",
        "Config Location",
        "State",
        iw = index_width,
        nw = name_width,
        pw = param_width
    ));

    for row in rows {
        let state = match (row.running, row.pid) {
            (true, Some(pid)) => format!("{} (pid {})", "Running".green(), pid),
            (true, None) => "Running".green().to_string(),
            (false, _) => String::new(),
        };
        out.push_str(&format!(
            "{:>iw$}  {:<nw$}  {:<pw$}  {}\n",
            row.index,
            row.name,
            row.start_param,
            state,
            iw = index_width,
            nw = name_width,
            pw = param_width
        ));
    }
    out
}
