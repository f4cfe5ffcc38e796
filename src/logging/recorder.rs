//! Append-only store of every message logged during a session

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use log::{Level, LevelFilter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::RecorderError;
use crate::nodes::NodePath;

/// One recorded message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: String,
    /// Node the message was logged for, used to locate the authoring node
    pub node_path: Option<NodePath>,
    pub message: String,
}

/// Recorder options, part of the session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecorderOptions {
    /// Oldest entries are evicted beyond this count; 0 keeps everything
    pub max_entries: usize,
    /// Messages below this level are not recorded
    pub min_level: LevelFilter,
}

impl Default for LogRecorderOptions {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            min_level: LevelFilter::Trace,
        }
    }
}

/// Accumulates messages from every logger of a session
#[derive(Debug)]
pub struct LogRecorder {
    options: LogRecorderOptions,
    entries: RwLock<VecDeque<LogEntry>>,
}

impl LogRecorder {
    pub fn new(options: LogRecorderOptions) -> Self {
        Self {
            options,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub fn options(&self) -> &LogRecorderOptions {
        &self.options
    }

    /// Append an entry. Returns false if it was filtered by level.
    pub fn record(&self, entry: LogEntry) -> bool {
        if entry.level > self.options.min_level {
            return false;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        if self.options.max_entries > 0 {
            while entries.len() > self.options.max_entries {
                entries.pop_front();
            }
        }
        true
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Entries logged for `path` or any node nested inside it
    pub fn entries_for(&self, path: &NodePath) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.node_path.as_ref().is_some_and(|p| path.is_ancestor_of(p)))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Export all entries as JSON for inspection
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries())
    }
}

/// Slot holding a recorder that is configured exactly once
#[derive(Debug, Default)]
pub struct RecorderCell {
    cell: OnceCell<Arc<LogRecorder>>,
}

impl RecorderCell {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Install the recorder. Fails if the slot was configured before.
    pub fn configure(&self, options: LogRecorderOptions) -> Result<Arc<LogRecorder>, RecorderError> {
        let recorder = Arc::new(LogRecorder::new(options));
        self.cell
            .set(Arc::clone(&recorder))
            .map_err(|_| RecorderError::AlreadyConfigured)?;
        Ok(recorder)
    }

    pub fn get(&self) -> Result<Arc<LogRecorder>, RecorderError> {
        self.cell.get().cloned().ok_or(RecorderError::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.cell.get().is_some()
    }
}

static GLOBAL_RECORDER: RecorderCell = RecorderCell::new();

/// Configure the process-wide recorder. Succeeds once per process.
pub fn configure_global(options: LogRecorderOptions) -> Result<Arc<LogRecorder>, RecorderError> {
    GLOBAL_RECORDER.configure(options)
}

/// The process-wide recorder holding every message from every logger
pub fn global_recorder() -> Result<Arc<LogRecorder>, RecorderError> {
    GLOBAL_RECORDER.get()
}
