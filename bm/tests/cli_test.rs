//! CLI integration tests
//!
//! Each test runs the `bm` binary with HOME and the XDG directories pointed
//! into a temp dir so nothing touches the real data directory.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            temp: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write a config with the given YAML body and return its path
    fn config(&self, body: &str) -> PathBuf {
        let path = self.temp.path().join("bots.yml");
        fs::write(&path, body).expect("Failed to write config");
        path
    }

    /// Config for `sleep`-based bots whose files stay inside the sandbox
    fn sleeper_config(&self) -> PathBuf {
        let root = self.temp.path().display();
        self.config(&format!(
            r#"
bot_directory: {root}
command: [sleep]
logs_dir: {root}/logs
state_file: {root}/state.json
bots:
  alpha: "30"
  beta: "30"
"#
        ))
    }

    fn bm(&self) -> Command {
        let mut cmd = Command::cargo_bin("bm").expect("bm binary");
        cmd.current_dir(self.temp.path())
            .env("HOME", self.temp.path())
            .env("XDG_DATA_HOME", self.temp.path().join("data"))
            .env("XDG_CONFIG_HOME", self.temp.path().join("config"))
            .env("NO_COLOR", "1");
        cmd
    }
}

#[test]
fn test_help() {
    let sandbox = Sandbox::new();
    sandbox
        .bm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start-all"))
        .stdout(predicate::str::contains("logs"));
}

#[test]
fn test_missing_bot_directory_is_fatal() {
    let sandbox = Sandbox::new();
    let config = sandbox.config("bots:\n  alpha: a.json\n");

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Bot directory not set"));
}

#[test]
fn test_list_shows_configured_bots() {
    let sandbox = Sandbox::new();
    let config = sandbox.sleeper_config();

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bot Name"))
        .stdout(predicate::str::contains("alpha"))
        .stdout(predicate::str::contains("beta"))
        .stdout(predicate::str::contains("Running").not());
}

#[test]
fn test_list_without_bots() {
    let sandbox = Sandbox::new();
    let root = sandbox.temp.path().display().to_string();
    let config = sandbox.config(&format!("bot_directory: {root}\nstate_file: {root}/state.json\n"));

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No bots configured"))
        .stdout(predicate::str::contains("Bot Name").not());
}

#[test]
fn test_unknown_target_fails() {
    let sandbox = Sandbox::new();
    let config = sandbox.sleeper_config();

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["start", "gamma"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No bot named \"gamma\""));

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["stop", "7"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No bot found with number 7"));
}

#[test]
fn test_start_list_stop_across_invocations() {
    let sandbox = Sandbox::new();
    let config = sandbox.sleeper_config();

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["start", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started alpha (pid"));

    // A second invocation finds the bot through the state file
    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["start", "alpha"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bot \"alpha\" is already running!"));

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Running (pid"));

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["stop", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped alpha (pid"));

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["stop", "alpha"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not running!"));
}

#[test]
fn test_logs_without_output() {
    let sandbox = Sandbox::new();
    let config = sandbox.sleeper_config();

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["logs", "alpha", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("==> alpha (stopped) <=="))
        .stdout(predicate::str::contains("==> beta (stopped) <=="))
        .stdout(predicate::str::contains("No log output yet."));
}

#[test]
fn test_logs_prints_tail() {
    let sandbox = Sandbox::new();
    let config = sandbox.sleeper_config();
    let logs = sandbox.temp.path().join("logs");
    fs::create_dir_all(&logs).expect("Failed to create logs dir");
    fs::write(logs.join("alpha.log"), "one\ntwo\nthree\n").expect("Failed to write log");

    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["logs", "alpha", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("two\nthree"))
        .stdout(predicate::str::contains("one").not());

    // A line count beyond the file size prints the whole log
    sandbox
        .bm()
        .arg("-c")
        .arg(&config)
        .args(["logs", "alpha", "-n", usize::MAX.to_string().as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("one\ntwo\nthree"));
}
