//! Monitor agent configuration, read from a TOML file.
//!
//! ```toml
//! log_level = "debug"
//! log_dir = ".ml_monitor"   # omit to log to stderr
//!
//! [push]
//! endpoint = "localhost:9091"
//! job = "ml_monitor"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorPushConfig {
    pub endpoint: String,
    #[serde(default = "default_job")]
    pub job: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub push: Option<MonitorPushConfig>,
}

fn default_level() -> String {
    "debug".to_string()
}

fn default_job() -> String {
    "ml_monitor".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_level: default_level(),
            log_dir: Some(PathBuf::from(
                crate::infrastructure::observability::logging::DEFAULT_LOG_DIR,
            )),
            push: None,
        }
    }
}

impl MonitorConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse monitor config TOML")
    }

    /// Loads the config file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read monitor config file: {}", path.display()))?;
        Self::from_toml(&content).context(format!("Invalid monitor config: {}", path.display()))
    }

    /// Same config with the log level replaced.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = MonitorConfig::from_toml(
            r#"
            log_level = "debug"
            log_dir = "/var/log/ml"

            [push]
            endpoint = "gw:9091"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/ml")));
        let push = config.push.unwrap();
        assert_eq!(push.endpoint, "gw:9091");
        assert_eq!(push.job, "ml_monitor");
    }

    #[test]
    fn test_empty_config_logs_to_stderr() {
        let config = MonitorConfig::from_toml("").unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.log_dir.is_none());
        assert!(config.push.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("missing_{}.toml", uuid::Uuid::new_v4()));
        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_log_level_override() {
        let config = MonitorConfig::from_toml("log_level = \"error\"")
            .unwrap()
            .with_log_level("debug");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(MonitorConfig::from_toml("log_level = ").is_err());
    }
}
