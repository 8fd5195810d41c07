//! Persisted worker state
//!
//! The state file is a JSON object mapping worker name to `{"pid": ...}`.
//! It records which workers the supervisor last believed were running, so a
//! restarted supervisor can adopt workers that outlived its predecessor.
//!
//! Storage failures never propagate: an unreadable file loads as empty and a
//! failed write is logged. Losing the file only means orphans go untracked.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::process::is_process_alive;

/// Persisted record for one running worker
///
/// Unknown fields in the file are ignored on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerState {
    /// OS process id
    pub pid: u32,

    /// When this supervisor (or a predecessor) launched the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Durable name -> PID mapping
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    entries: BTreeMap<String, WorkerState>,
}

impl StateStore {
    /// Load the state file, dropping entries whose process no longer exists
    ///
    /// The pruned mapping is written back immediately.
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self::load_with_probe(path, is_process_alive)
    }

    fn load_with_probe(path: impl AsRef<Path>, alive: impl Fn(u32) -> bool) -> Self {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "StateStore::load: called");

        let mut entries = read_entries(&path);
        let before = entries.len();
        entries.retain(|name, state| {
            let keep = alive(state.pid);
            if !keep {
                info!(name = %name, pid = state.pid, "Dropping stale worker state");
            }
            keep
        });
        info!(kept = entries.len(), pruned = before - entries.len(), "Loaded worker state");

        let store = Self { path, entries };
        store.save();
        store
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted record for a worker, if any
    pub fn get(&self, name: &str) -> Option<&WorkerState> {
        self.entries.get(name)
    }

    /// All persisted records, sorted by name
    pub fn entries(&self) -> &BTreeMap<String, WorkerState> {
        &self.entries
    }

    /// Record a newly started worker and persist
    pub fn upsert(&mut self, name: &str, pid: u32) {
        debug!(name, pid, "StateStore::upsert: called");
        self.entries.insert(
            name.to_string(),
            WorkerState {
                pid,
                started_at: Some(Utc::now()),
            },
        );
        self.save();
    }

    /// Forget a worker and persist
    pub fn remove(&mut self, name: &str) -> Option<WorkerState> {
        debug!(name, "StateStore::remove: called");
        let removed = self.entries.remove(name);
        if removed.is_some() {
            self.save();
        }
        removed
    }

    /// Keep only entries matching the predicate, persisting if anything was
    /// dropped. Returns the dropped names.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &WorkerState) -> bool) -> Vec<String> {
        let mut dropped = Vec::new();
        self.entries.retain(|name, state| {
            let kept = keep(name, state);
            if !kept {
                dropped.push(name.clone());
            }
            kept
        });
        if !dropped.is_empty() {
            debug!(?dropped, "StateStore::retain: dropped entries");
            self.save();
        }
        dropped
    }

    /// Overwrite the state file with the full current mapping
    ///
    /// Failures are logged, never returned.
    pub fn save(&self) {
        if let Err(e) = self.write() {
            error!(path = %self.path.display(), error = ?e, "Failed to save worker state");
        }
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        let json = serde_json::to_string_pretty(&self.entries).context("Failed to serialize state")?;

        // Write to a sibling temp file then rename (atomic on same filesystem)
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).context(format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).context(format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), count = self.entries.len(), "Saved worker state");
        Ok(())
    }
}

/// Read entries from disk, treating every failure as "no state"
///
/// Entries that don't parse are skipped individually.
fn read_entries(path: &Path) -> BTreeMap<String, WorkerState> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(?path, "read_entries: no state file");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read state file, starting empty");
            return BTreeMap::new();
        }
    };

    let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed state file, starting empty");
            return BTreeMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(name, value)| match serde_json::from_value::<WorkerState>(value) {
            Ok(state) => Some((name, state)),
            Err(e) => {
                warn!(name = %name, error = %e, "Skipping malformed state entry");
                None
            }
        })
        .collect()
}
