//! Experiment tracking configuration parsing from environment variables.

use super::{Lookup, parse_or, string_or};
use anyhow::Result;

/// Tracking environment configuration
#[derive(Debug, Clone)]
pub struct TrackingEnvConfig {
    pub enabled: bool,
    pub tracking_uri: String,
    pub experiment_name: String,
    pub timeout_secs: u64,
}

impl Default for TrackingEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tracking_uri: "http://localhost:5000".to_string(),
            experiment_name: "lrgn_model".to_string(),
            timeout_secs: 30,
        }
    }
}

impl TrackingEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: parse_or(lookup, "TRACKING_ENABLED", defaults.enabled)?,
            tracking_uri: string_or(lookup, "MLFLOW_TRACKING_URI", &defaults.tracking_uri),
            experiment_name: string_or(lookup, "MLFLOW_EXPERIMENT_NAME", &defaults.experiment_name),
            timeout_secs: parse_or(lookup, "TRACKING_TIMEOUT_SECS", defaults.timeout_secs)?,
        })
    }
}
