//! Session setup: configuration on disk and the process-wide recorder
//!
//! The global recorder can be configured once per process, so its whole
//! lifecycle is exercised in a single test.

use std::fs;

use log::LevelFilter;
use nodle_session::logging::{self, LoggerFactory};
use nodle_session::{NodePath, RecorderError, SessionConfig};

#[test]
fn global_recorder_lifecycle() {
    assert_eq!(
        logging::global_recorder().unwrap_err(),
        RecorderError::NotConfigured
    );
    assert!(matches!(LoggerFactory::from_global(), Err(RecorderError::NotConfigured)));

    let config = SessionConfig::default();
    let recorder = logging::init_session(&config).unwrap();
    assert!(matches!(
        logging::init_session(&config),
        Err(RecorderError::AlreadyConfigured)
    ));

    let factory = LoggerFactory::from_global().unwrap();
    let path = NodePath::new(vec![3, 8]);
    factory.create_logger(None, Some(&path)).error("nested renderer");

    let global = logging::global_recorder().unwrap();
    assert!(std::sync::Arc::ptr_eq(&global, &recorder));
    let entries = global.entries_for(&NodePath::root(3));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category, "nodes::3::8");
}

#[test]
fn config_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let mut config = SessionConfig::default();
    config.log_filter = "warn,nodes=debug".to_string();
    config.recorder.max_entries = 64;
    config.recorder.min_level = LevelFilter::Info;
    config.adapter.cache_plans = false;
    config.save(&path).unwrap();

    let loaded = SessionConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn config_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let err = SessionConfig::load(&missing).unwrap_err();
    assert!(err.to_string().contains("missing.json"));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    let err = SessionConfig::load(&broken).unwrap_err();
    assert!(matches!(err, nodle_session::ConfigError::Parse { .. }));
}
