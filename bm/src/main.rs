//! BotManager - supervisor for named bot processes
//!
//! CLI entry point. Without a subcommand the dashboard is launched.

use std::fs;
use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use colored::*;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use eyre::{Context, Result};
use tracing::{debug, error, info};

use botmanager::cli::{Cli, Command, format_table, get_log_path};
use botmanager::config::Config;
use botmanager::registry::{LogLines, LogView, WorkerRegistry};
use botmanager::{RegistryError, tui};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Print an error and exit with status 1
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let refresh = Duration::from_millis(config.refresh_ms.max(50));

    let mut registry = match WorkerRegistry::open(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            fail(e);
        }
    };
    info!(bots = registry.config().len(), "BotManager started");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => tui::run(registry, refresh).await,
        Some(Command::List) => {
            if registry.config().is_empty() {
                println!("No bots configured. Add some under `bots:` in the config file.");
                return Ok(());
            }
            print!("{}", format_table(&registry.list()));
            Ok(())
        }
        Some(Command::Start { target }) => {
            let started = registry
                .resolve(&target)
                .and_then(|name| registry.start(&name))
                .unwrap_or_else(|e| fail(e));
            println!("{} {} (pid {})", "Started".green(), started.name, started.pid);
            Ok(())
        }
        Some(Command::Stop { target }) => {
            let stopped = registry
                .resolve(&target)
                .and_then(|name| registry.stop(&name))
                .unwrap_or_else(|e| fail(e));
            println!("{} {} (pid {})", "Stopped".yellow(), stopped.name, stopped.pid);
            Ok(())
        }
        Some(Command::StartAll) => {
            let results = registry.start_all();
            let outcomes = results.iter().map(|(name, r)| (name.as_str(), r.as_ref().map(|s| s.pid)));
            let failed = report_batch(outcomes, "Started");
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::StopAll) => {
            let results = registry.stop_all();
            let outcomes = results.iter().map(|(name, r)| (name.as_str(), r.as_ref().map(|s| s.pid)));
            let failed = report_batch(outcomes, "Stopped");
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Logs { targets, lines, follow }) => {
            let names: Vec<String> = targets
                .iter()
                .map(|target| registry.resolve(target))
                .collect::<Result<_, _>>()
                .unwrap_or_else(|e| fail(e));
            cmd_logs(&mut registry, &names, lines, follow, refresh).await
        }
    }
}

/// Print one line per bot; returns true if any failed
fn report_batch<'a>(
    results: impl Iterator<Item = (&'a str, Result<u32, &'a RegistryError>)>,
    verb: &str,
) -> bool {
    let mut failed = false;
    let mut any = false;
    for (name, result) in results {
        any = true;
        match result {
            Ok(pid) => println!("{} {} (pid {})", verb.green(), name, pid),
            Err(e) => {
                failed = true;
                eprintln!("{} {}: {}", "Failed".red(), name, e);
            }
        }
    }
    if !any {
        println!("Nothing to do");
    }
    failed
}

/// Print log tails, optionally reprinting every `refresh` until Ctrl+C
async fn cmd_logs(
    registry: &mut WorkerRegistry,
    names: &[String],
    lines: usize,
    follow: bool,
    refresh: Duration,
) -> Result<()> {
    debug!(?names, lines, follow, "cmd_logs: called");
    if !follow {
        print_tails(&registry.tail_logs(names, lines));
        return Ok(());
    }

    let mut interval = tokio::time::interval(refresh);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("cmd_logs: ctrl-c received, stopping");
                break;
            }
            _ = interval.tick() => {
                let views = registry.tail_logs(names, lines);
                execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
                print_tails(&views);
                println!("{}", "Following (Ctrl+C to stop)".dimmed());
                io::stdout().flush()?;
            }
        }
    }
    Ok(())
}

fn print_tails(views: &std::collections::BTreeMap<String, LogView>) {
    for (name, view) in views {
        let state = if view.running {
            "running".green()
        } else {
            "stopped".dimmed()
        };
        println!("==> {} ({}) <==", name.bold(), state);
        match &view.lines {
            LogLines::Lines(lines) => lines.iter().for_each(|line| println!("{}", line)),
            LogLines::NoLogYet => println!("{}", "No log output yet.".dimmed()),
            LogLines::Error(e) => println!("{} {}", "Error:".red(), e),
        }
        println!();
    }
}
