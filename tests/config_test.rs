use std::io::Write;
use std::path::PathBuf;

use taskq::Error;
use taskq::config::Config;

#[test]
fn config_file_supplies_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
database = "/tmp/queue.db"
otel_endpoint = "http://collector:4318"
log_level = "warn"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.database_path, PathBuf::from("/tmp/queue.db"));
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://collector:4318"));
    assert_eq!(config.log_level, "warn");
}

#[test]
fn partial_config_file_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"log_level = "debug""#).unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.database_path, PathBuf::from("taskq.db"));
    assert!(config.otel_endpoint.is_none());
    assert_eq!(config.log_level, "debug");
}

#[test]
fn environment_overrides_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"database = "/from/file.db""#).unwrap();
    let file_path = file.path().to_string_lossy().into_owned();

    let config = Config::from_lookup(|name| match name {
        "TASKQ_CONFIG" => Some(file_path.clone()),
        "TASKQ_DATABASE" => Some("/from/env.db".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.database_path, PathBuf::from("/from/env.db"));
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"databse = "typo.db""#).unwrap();

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn config_from_env_reads_process_environment() {
    unsafe {
        std::env::set_var("TASKQ_DATABASE", "/tmp/env-test.db");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.database_path, PathBuf::from("/tmp/env-test.db"));
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::remove_var("TASKQ_DATABASE");
    }
}
