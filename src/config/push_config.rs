//! Pushgateway configuration parsing from environment variables.

use super::{Lookup, parse_or, string_or};
use anyhow::Result;

/// Push environment configuration
#[derive(Debug, Clone)]
pub struct PushEnvConfig {
    pub enabled: bool,
    /// `host:port`, scheme optional
    pub endpoint: String,
    pub job: String,
}

impl Default for PushEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "localhost:9091".to_string(),
            job: "model_metrics".to_string(),
        }
    }
}

impl PushEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let defaults = Self::default();
        let job = string_or(lookup, "PUSHGATEWAY_JOB", &defaults.job);
        if job.is_empty() || job.contains('/') {
            anyhow::bail!("PUSHGATEWAY_JOB must be non-empty and contain no '/': {:?}", job);
        }
        Ok(Self {
            enabled: parse_or(lookup, "PUSH_ENABLED", defaults.enabled)?,
            endpoint: string_or(lookup, "PUSHGATEWAY_ADDRESS", &defaults.endpoint),
            job,
        })
    }
}
