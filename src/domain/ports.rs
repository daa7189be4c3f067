use crate::domain::errors::TrackingError;
use std::collections::BTreeMap;
use std::path::Path;

/// Identity of a tracked run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub artifact_uri: String,
}

/// One entry of a run's artifact listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub path: String,
    pub is_dir: bool,
    pub file_size: Option<u64>,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Experiment tracking backend (parameters, metrics, artifacts per run).
pub trait ExperimentTracker {
    /// Opens a run in `experiment`, creating the experiment if needed.
    fn start_run(&self, experiment: &str) -> Result<RunInfo, TrackingError>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError>;

    fn log_metrics(&self, run_id: &str, metrics: &BTreeMap<String, f64>)
    -> Result<(), TrackingError>;

    /// Stores `local_path` under `artifact_path` in the run's artifact root.
    fn log_artifact(
        &self,
        run: &RunInfo,
        local_path: &Path,
        artifact_path: &str,
    ) -> Result<(), TrackingError>;

    fn list_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<ArtifactInfo>, TrackingError>;

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError>;
}
