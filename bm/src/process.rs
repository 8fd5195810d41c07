//! Worker process ownership and PID-level signalling
//!
//! A [`ProcessHandle`] owns one child spawned by this supervisor instance.
//! Workers inherited from a previous instance have no handle, only a PID, and
//! are probed and signalled through [`is_process_alive`] and [`terminate_pid`].

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from launching a worker
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to launch '{program}' in {}: {source}", working_dir.display())]
    Launch {
        program: String,
        working_dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One live child process started by this supervisor
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    child: Child,
    pid: u32,
}

impl ProcessHandle {
    /// Launch `program args...` in `working_dir` with stdout and stderr both
    /// appended to `log_path`
    ///
    /// Returns as soon as the child is running; never waits for it.
    pub fn spawn(
        name: &str,
        program: &str,
        args: &[String],
        working_dir: &Path,
        log_path: &Path,
    ) -> Result<Self, SpawnError> {
        debug!(name, program, ?args, ?working_dir, ?log_path, "ProcessHandle::spawn: called");

        let log_err = |source| SpawnError::LogFile {
            path: log_path.to_path_buf(),
            source,
        };

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(log_err)?;
        }
        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(log_err)?;
        let stderr = stdout.try_clone().map_err(log_err)?;

        let child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| SpawnError::Launch {
                program: program.to_string(),
                working_dir: working_dir.to_path_buf(),
                source,
            })?;

        let pid = child.id();
        info!(name, pid, program, "Spawned worker process");
        Ok(Self {
            name: name.to_string(),
            child,
            pid,
        })
    }

    /// Worker name this handle belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking exit poll
    ///
    /// Reaps the child if it has exited. A failed poll counts as not running.
    pub fn is_running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(name = %self.name, pid = self.pid, %status, "ProcessHandle::is_running: exited");
                false
            }
            Err(e) => {
                warn!(name = %self.name, pid = self.pid, error = %e, "Failed to poll worker exit status");
                false
            }
        }
    }

    /// Send SIGTERM without waiting for exit
    ///
    /// A child that has already exited is left alone, since its PID may have
    /// been reaped and reused.
    pub fn terminate(&mut self) -> io::Result<()> {
        debug!(name = %self.name, pid = self.pid, "ProcessHandle::terminate: called");
        if !self.is_running() {
            debug!(name = %self.name, "ProcessHandle::terminate: already exited");
            return Ok(());
        }
        terminate_pid(self.pid)
    }
}

/// Convert a persisted PID into a signal target
///
/// PID 0 and values beyond `i32::MAX` would address process groups.
fn signal_target(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().filter(|&raw| raw > 0).map(Pid::from_raw)
}

/// Check whether any process with the given PID exists
pub fn is_process_alive(pid: u32) -> bool {
    let Some(target) = signal_target(pid) else {
        debug!(pid, "is_process_alive: invalid pid");
        return false;
    };

    // Signal 0 only checks existence. EPERM means it exists under another user.
    let result = match kill(target, None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    };
    debug!(pid, result, "is_process_alive: checked");
    result
}

/// Send SIGTERM to a PID this supervisor holds no handle for
///
/// A process that is already gone counts as success.
pub fn terminate_pid(pid: u32) -> io::Result<()> {
    let target = signal_target(pid)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pid {}", pid)))?;

    match kill(target, Signal::SIGTERM) {
        Ok(()) => {
            debug!(pid, "terminate_pid: sent SIGTERM");
            Ok(())
        }
        Err(Errno::ESRCH) => {
            debug!(pid, "terminate_pid: process already gone");
            Ok(())
        }
        Err(e) => Err(io::Error::from(e)),
    }
}
