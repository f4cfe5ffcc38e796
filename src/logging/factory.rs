//! Loggers addressed by node position

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::{log, Level};

use super::recorder::{global_recorder, LogEntry, LogRecorder};
use crate::error::RecorderError;
use crate::nodes::NodePath;

/// Category used when neither a category nor a node path is given
pub const DEFAULT_CATEGORY: &str = "nodle_session";

/// Creates loggers that feed one recorder
#[derive(Debug, Clone)]
pub struct LoggerFactory {
    recorder: Arc<LogRecorder>,
}

impl LoggerFactory {
    pub fn new(recorder: Arc<LogRecorder>) -> Self {
        Self { recorder }
    }

    /// Factory feeding the process-wide recorder
    pub fn from_global() -> Result<Self, RecorderError> {
        Ok(Self::new(global_recorder()?))
    }

    pub fn recorder(&self) -> &Arc<LogRecorder> {
        &self.recorder
    }

    /// Create a logger. Without a category, it is inferred from `node_path`.
    pub fn create_logger(&self, category: Option<&str>, node_path: Option<&NodePath>) -> NodeLogger {
        let category = match (category, node_path) {
            (Some(category), _) => category.to_string(),
            (None, Some(path)) => path.category(),
            (None, None) => DEFAULT_CATEGORY.to_string(),
        };
        NodeLogger {
            category,
            node_path: node_path.cloned(),
            recorder: Arc::clone(&self.recorder),
        }
    }
}

/// Logger bound to a category and optionally to the node that owns it
///
/// Messages go to the recorder and are forwarded to the `log` facade with the
/// category as target.
#[derive(Debug, Clone)]
pub struct NodeLogger {
    category: String,
    node_path: Option<NodePath>,
    recorder: Arc<LogRecorder>,
}

impl NodeLogger {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn node_path(&self) -> Option<&NodePath> {
        self.node_path.as_ref()
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        let message = message.to_string();
        log!(target: self.category.as_str(), level, "{}", message);
        self.recorder.record(LogEntry {
            timestamp: Utc::now(),
            level,
            category: self.category.clone(),
            node_path: self.node_path.clone(),
            message,
        });
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Level::Trace, message);
    }
}
