//! Typed configuration from environment variables and an optional TOML file.
//!
//! Loads once at startup. Environment values override file values.
//! In local dev, call `dotenvy::dotenv().ok()` before [`Config::from_env`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_DATABASE: &str = "taskq.db";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// On-disk shape. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<PathBuf>,
    otel_endpoint: Option<String>,
    log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            otel_endpoint: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `TASKQ_CONFIG` names an optional TOML file; `TASKQ_DATABASE`,
    /// `OTEL_ENDPOINT` and `LOG_LEVEL` override it.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = match lookup("TASKQ_CONFIG") {
            Some(path) => read_file(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let config = Self {
            database_path: lookup("TASKQ_DATABASE")
                .map(PathBuf::from)
                .or(file.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            otel_endpoint: lookup("OTEL_ENDPOINT")
                .or(file.otel_endpoint)
                .filter(|e| !e.trim().is_empty()),
            log_level: lookup("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file alone.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = read_file(path)?;
        let defaults = Self::default();

        let config = Self {
            database_path: file.database.unwrap_or(defaults.database_path),
            otel_endpoint: file.otel_endpoint.filter(|e| !e.trim().is_empty()),
            log_level: file.log_level.unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("database path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read config {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("bad config {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn environment_values_are_used() {
        let config = Config::from_lookup(lookup_from(&[
            ("TASKQ_DATABASE", "/var/lib/taskq/queue.db"),
            ("OTEL_ENDPOINT", "http://localhost:4318"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/taskq/queue.db"));
        assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4318"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn blank_endpoint_means_no_export() {
        let config = Config::from_lookup(lookup_from(&[("OTEL_ENDPOINT", "  ")])).unwrap();
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("TASKQ_DATABASE", "")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = Config::from_lookup(lookup_from(&[(
            "TASKQ_CONFIG",
            "/definitely/not/here/taskq.toml",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }
}
