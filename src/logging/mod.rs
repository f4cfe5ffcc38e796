//! Session logging - the log facade setup, the global recorder, node loggers
//! and persistent node messages

pub mod factory;
pub mod messages;
pub mod recorder;

use std::sync::Arc;

use log::info;

use crate::config::SessionConfig;
use crate::error::RecorderError;

pub use factory::{LoggerFactory, NodeLogger, DEFAULT_CATEGORY};
pub use messages::{MessageBoard, MessageToken, NodeMessage, Severity, SubtreeDiagnostic};
pub use recorder::{
    configure_global, global_recorder, LogEntry, LogRecorder, LogRecorderOptions, RecorderCell,
};

/// Install `env_logger` with the configured filter.
/// Returns false if a logger was already installed.
pub fn init(config: &SessionConfig) -> bool {
    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Set up logging for a session: the `log` backend plus the global recorder
pub fn init_session(config: &SessionConfig) -> Result<Arc<LogRecorder>, RecorderError> {
    init(config);
    let recorder = configure_global(config.recorder.clone())?;
    info!(
        "Session recorder ready (max {} entries, level {})",
        config.recorder.max_entries, config.recorder.min_level
    );
    Ok(recorder)
}
