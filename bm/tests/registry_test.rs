//! Integration tests for the worker registry
//!
//! These spawn real `sleep` and `sh` processes in temp directories.

use std::time::{Duration, Instant};

use botmanager::config::Config;
use botmanager::registry::{LogLines, WorkerRegistry};
use botmanager::{RegistryError, StateStore, terminate_pid};
use tempfile::TempDir;

fn config(temp: &TempDir, command: &[&str], bots: &[(&str, &str)]) -> Config {
    Config {
        bots: bots.iter().map(|(n, p)| (n.to_string(), p.to_string())).collect(),
        bot_directory: Some(temp.path().to_path_buf()),
        command: command.iter().map(|s| s.to_string()).collect(),
        logs_dir: temp.path().join("logs"),
        state_file: temp.path().join("state.json"),
        ..Default::default()
    }
}

fn sleepers(temp: &TempDir) -> Config {
    config(temp, &["sleep"], &[("alpha", "30"), ("beta", "30")])
}

/// Poll until `check` passes or five seconds elapse
fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    false
}

// =============================================================================
// Start / Stop
// =============================================================================

#[test]
fn test_start_then_stop() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = sleepers(&temp);
    let mut reg = WorkerRegistry::open(&config).expect("valid config");

    let started = reg.start("alpha").expect("start alpha");
    assert_eq!(started.name, "alpha");
    assert!(reg.is_running("alpha"));

    let rows = reg.list();
    assert!(rows[0].running);
    assert_eq!(rows[0].pid, Some(started.pid));
    assert!(rows[0].started_at.is_some());
    assert!(!rows[1].running);

    // Persisted before start returns
    let store = StateStore::load(&config.state_file);
    assert_eq!(store.get("alpha").map(|s| s.pid), Some(started.pid));

    let stopped = reg.stop("alpha").expect("stop alpha");
    assert_eq!(stopped.pid, started.pid);
    assert!(!stopped.orphan);
    assert!(!reg.is_running("alpha"));

    let store = StateStore::load(&config.state_file);
    assert!(store.get("alpha").is_none());
}

#[test]
fn test_double_start_is_rejected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut reg = WorkerRegistry::open(&sleepers(&temp)).expect("valid config");

    let first = reg.start("alpha").expect("first start");
    let err = reg.start("alpha").unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRunning(ref name) if name == "alpha"));
    assert_eq!(err.to_string(), "Bot \"alpha\" is already running!");

    // The original process is untouched
    assert_eq!(reg.list()[0].pid, Some(first.pid));
    reg.stop("alpha").expect("stop alpha");
}

#[test]
fn test_stop_without_start() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut reg = WorkerRegistry::open(&sleepers(&temp)).expect("valid config");

    let err = reg.stop("beta").unwrap_err();
    assert!(matches!(err, RegistryError::NotRunning(ref name) if name == "beta"));
    assert!(err.is_expected());
}

#[test]
fn test_spawn_failure_leaves_bot_absent() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp, &["botmanager-no-such-program"], &[("alpha", "a.json")]);
    let mut reg = WorkerRegistry::open(&config).expect("valid config");

    let err = reg.start("alpha").unwrap_err();
    assert!(matches!(err, RegistryError::Spawn(_)));
    assert!(!err.is_expected());
    assert!(!reg.list()[0].running);
    assert!(StateStore::load(&config.state_file).get("alpha").is_none());
}

// =============================================================================
// Liveness
// =============================================================================

#[test]
fn test_out_of_band_exit_is_detected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = sleepers(&temp);
    let mut reg = WorkerRegistry::open(&config).expect("valid config");

    let started = reg.start("beta").expect("start beta");
    terminate_pid(started.pid).expect("signal beta");

    assert!(eventually(|| !reg.list()[1].running));
    assert!(StateStore::load(&config.state_file).get("beta").is_none());

    // A stopped bot can be started again
    reg.start("beta").expect("restart beta");
    reg.stop("beta").expect("stop beta");
}

#[test]
fn test_short_lived_worker_is_reaped() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp, &["sh", "-c", "echo launched with $0"], &[("alpha", "alpha.json")]);
    let mut reg = WorkerRegistry::open(&config).expect("valid config");

    reg.start("alpha").expect("start alpha");
    assert!(eventually(|| !reg.is_running("alpha")));
    assert_eq!(reg.reap(), vec!["alpha".to_string()]);
    assert!(!reg.list()[0].running);
    assert!(StateStore::load(&config.state_file).get("alpha").is_none());
}

#[test]
fn test_orphans_are_adopted_by_a_new_registry() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = sleepers(&temp);

    let pid = {
        let mut first = WorkerRegistry::open(&config).expect("valid config");
        first.start("alpha").expect("start alpha").pid
    };

    // A later supervisor sees the bot through the state file alone
    let mut second = WorkerRegistry::open(&config).expect("valid config");
    let rows = second.list();
    assert!(rows[0].running);
    assert_eq!(rows[0].pid, Some(pid));
    assert!(matches!(second.start("alpha"), Err(RegistryError::AlreadyRunning(_))));

    let stopped = second.stop("alpha").expect("stop orphan");
    assert!(stopped.orphan);
    assert_eq!(stopped.pid, pid);
    assert!(!second.list()[0].running);
}

// =============================================================================
// Selection and batches
// =============================================================================

#[test]
fn test_index_is_stable_across_state_changes() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut reg = WorkerRegistry::open(&sleepers(&temp)).expect("valid config");

    assert_eq!(reg.resolve_index("2").unwrap(), "beta");
    reg.start("alpha").expect("start alpha");
    assert_eq!(reg.resolve_index("2").unwrap(), "beta");
    assert_eq!(reg.resolve_index("1").unwrap(), "alpha");
    reg.stop("alpha").expect("stop alpha");
}

#[test]
fn test_start_all_and_stop_all() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut reg = WorkerRegistry::open(&sleepers(&temp)).expect("valid config");

    reg.start("beta").expect("start beta");

    // Only idle bots are started
    let started = reg.start_all();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].0, "alpha");
    assert!(started[0].1.is_ok());
    assert!(reg.list().iter().all(|w| w.running));
    assert!(reg.start_all().is_empty());

    let stopped = reg.stop_all();
    assert_eq!(stopped.len(), 2);
    assert!(stopped.iter().all(|(_, r)| r.is_ok()));
    assert!(reg.list().iter().all(|w| !w.running));
    assert!(reg.stop_all().is_empty());
}

// =============================================================================
// Logs
// =============================================================================

#[test]
fn test_worker_output_lands_in_log() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = config(
        &temp,
        &["sh", "-c", "echo out $0; echo err $0 >&2"],
        &[("alpha", "alpha.json")],
    );
    let mut reg = WorkerRegistry::open(&config).expect("valid config");
    let names = vec!["alpha".to_string()];

    assert_eq!(reg.tail_logs(&names, 10)["alpha"].lines, LogLines::NoLogYet);

    reg.start("alpha").expect("start alpha");
    let expected = LogLines::Lines(vec!["out alpha.json".to_string(), "err alpha.json".to_string()]);
    assert!(eventually(|| reg.tail_logs(&names, 10)["alpha"].lines == expected));

    // Starting again appends rather than truncating
    assert!(eventually(|| !reg.is_running("alpha")));
    reg.start("alpha").expect("restart alpha");
    assert!(eventually(|| match &reg.tail_logs(&names, 10)["alpha"].lines {
        LogLines::Lines(lines) => lines.len() == 4,
        _ => false,
    }));
}
