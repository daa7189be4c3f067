//! Configuration module for ml-monitor.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Dataset, Tracking, Push and the Monitor agent (TOML file).

mod dataset_config;
mod monitor_config;
mod push_config;
mod tracking_config;

pub use dataset_config::DatasetEnvConfig;
pub use monitor_config::{MonitorConfig, MonitorPushConfig};
pub use push_config::PushEnvConfig;
pub use tracking_config::TrackingEnvConfig;

use crate::domain::drift::ExtractionMode;
use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Source of configuration values, keyed by environment variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Main experiment configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub dataset: DatasetEnvConfig,
    pub tracking: TrackingEnvConfig,
    pub push: PushEnvConfig,

    pub artifact_dir: PathBuf,
    pub monitor_config_path: PathBuf,
    pub log_level: String,
    /// `None` logs to stderr
    pub log_dir: Option<PathBuf>,
    /// Replaces the monitor agent's configured level when set
    pub monitor_log_level: Option<String>,
    pub drift_extraction: ExtractionMode,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let dataset =
            DatasetEnvConfig::from_lookup(lookup).context("Failed to load dataset config")?;
        let tracking =
            TrackingEnvConfig::from_lookup(lookup).context("Failed to load tracking config")?;
        let push = PushEnvConfig::from_lookup(lookup).context("Failed to load push config")?;

        let drift_extraction = parse_or(lookup, "DRIFT_EXTRACTION", ExtractionMode::Degraded)?;

        Ok(Self {
            dataset,
            tracking,
            push,
            artifact_dir: PathBuf::from(string_or(lookup, "ARTIFACT_DIR", "./artifacts")),
            monitor_config_path: PathBuf::from(string_or(
                lookup,
                "MONITOR_CONFIG",
                "ml_monitor/config.toml",
            )),
            log_level: string_or(lookup, "LOG_LEVEL", "info"),
            log_dir: lookup("LOG_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            monitor_log_level: lookup("MONITOR_LOG_LEVEL").filter(|s| !s.trim().is_empty()),
            drift_extraction,
        })
    }
}

pub(crate) fn string_or(lookup: Lookup, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_or<T>(lookup: Lookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        None => Ok(default),
    }
}

pub(crate) fn list_or(lookup: Lookup, key: &str, default: &[&str]) -> Vec<String> {
    match lookup(key) {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}
