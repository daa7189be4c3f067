//! End-to-end experiment: train, evaluate, measure drift, report.
//!
//! One `run` loads the reference and production datasets, fits the
//! regression model on a split of the reference data, computes data and
//! target drift, then hands the results to every configured sink: the
//! monitor agent, the experiment tracker and the push endpoint.

use super::drift::{
    DATA_DRIFT_REPORT_FILE, DataDriftReport, TARGET_DRIFT_REPORT_FILE, TargetDriftReport,
    extract_drift, extract_target_drift,
};
use super::model::{RegressionModel, train_test_split};
use super::preprocessing::Preprocessor;
use super::{MONITOR_DRIFT_PREFIX, drift_metric_map, model_report_batch};
use crate::config::Config;
use crate::domain::metrics::RunMetrics;
use crate::domain::ports::{ArtifactInfo, ExperimentTracker, RunInfo, RunStatus};
use crate::infrastructure::csv_loader::load_dataset;
use crate::infrastructure::observability::{LogHandle, MetricsAggregator, Monitor};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Artifact directory names inside a tracked run.
const MODEL_ARTIFACT_PATH: &str = "model";
const DATA_DRIFT_ARTIFACT_PATH: &str = "drift_report";
const TARGET_DRIFT_ARTIFACT_PATH: &str = "target_drift_report";

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub metrics: RunMetrics,
    pub dataset_drift: bool,
    pub data_drift_report: PathBuf,
    pub target_drift_report: PathBuf,
    pub model_path: PathBuf,
    /// Tracker run id, when a tracker is configured
    pub run_id: Option<String>,
    /// Listing of the tracked `drift_report` artifacts
    pub artifacts: Vec<ArtifactInfo>,
}

/// Local products of the training and drift phase
struct RunArtifacts {
    metrics: RunMetrics,
    dataset_drift: bool,
    data_drift_report: PathBuf,
    target_drift_report: PathBuf,
    model_path: PathBuf,
}

pub struct Experiment<'a> {
    config: Config,
    log: &'a LogHandle,
    monitor: Monitor,
    tracker: Option<&'a dyn ExperimentTracker>,
    aggregator: Option<MetricsAggregator>,
}

impl<'a> Experiment<'a> {
    pub fn new(config: Config, log: &'a LogHandle, monitor: Monitor) -> Self {
        Self {
            config,
            log,
            monitor,
            tracker: None,
            aggregator: None,
        }
    }

    pub fn with_tracker(mut self, tracker: &'a dyn ExperimentTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_aggregator(mut self, aggregator: MetricsAggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Runs the experiment. The monitor is stopped (and pushed) whether or
    /// not the run succeeds.
    pub fn run(&mut self) -> Result<ExperimentOutcome> {
        self.monitor.start().context("Failed to start monitor")?;
        let result = self.execute();
        let stopped = self.monitor.stop().context("Failed to stop monitor");
        let outcome = result?;
        stopped?;
        self.log.info("Experiment completed");
        Ok(outcome)
    }

    fn execute(&mut self) -> Result<ExperimentOutcome> {
        let local = self.train_and_measure()?;
        self.record_monitor_metrics(&local.metrics)?;

        let (run_id, artifacts) = match self.tracker {
            Some(tracker) => {
                let run = tracker
                    .start_run(&self.config.tracking.experiment_name)
                    .context("Failed to start tracker run")?;
                let body = self.tracked_run(tracker, &run, &local);
                finish_run(self.log, tracker, &run, body)?
            }
            None => {
                self.push(&local.metrics)?;
                (None, Vec::new())
            }
        };

        Ok(ExperimentOutcome {
            metrics: local.metrics,
            dataset_drift: local.dataset_drift,
            data_drift_report: local.data_drift_report,
            target_drift_report: local.target_drift_report,
            model_path: local.model_path,
            run_id,
            artifacts,
        })
    }

    fn train_and_measure(&self) -> Result<RunArtifacts> {
        let dataset = &self.config.dataset;
        let mapping = &dataset.mapping;

        let reference = load_dataset(&dataset.reference_path, mapping)
            .context("Failed to load reference data")?;
        let production = load_dataset(&dataset.production_path, mapping)
            .context("Failed to load production data")?;
        self.log.info(&format!(
            "Loaded {} reference rows and {} production rows",
            reference.len(),
            production.len()
        ));

        let split = train_test_split(reference.len(), dataset.test_size, dataset.random_state)?;
        let train = reference.select(&split.train);
        let test = reference.select(&split.test);

        let (preprocessor, x_train) = Preprocessor::fit_transform(&train, mapping)?;
        let x_test = preprocessor.transform(&test)?;
        let y_train = train.target_values(&mapping.target)?;
        let y_test = test.target_values(&mapping.target)?;
        debug!("Features: {:?}", preprocessor.feature_names());

        let model = RegressionModel::fit(&x_train, &y_train)?;
        let evaluation = model.evaluate(&x_test, &y_test)?;
        self.log.info(&format!(
            "Model Performance - MSE: {:.4}, R2: {:.4}, Accuracy: {:.2}%",
            evaluation.mse,
            evaluation.r2,
            evaluation.accuracy_pct()
        ));

        let artifact_dir = &self.config.artifact_dir;
        std::fs::create_dir_all(artifact_dir).with_context(|| {
            format!("Failed to create artifact directory {}", artifact_dir.display())
        })?;

        let model_path = artifact_dir.join(MODEL_ARTIFACT_PATH).join("model.json");
        model
            .save_json(&model_path)
            .with_context(|| format!("Failed to save model to {}", model_path.display()))?;

        let data_report = DataDriftReport::run(&reference, &production, mapping)?;
        let data_drift_report = artifact_dir.join(DATA_DRIFT_REPORT_FILE);
        data_report.save_html(&data_drift_report)?;

        let target_report = TargetDriftReport::run(&reference, &production, &mapping.target)?;
        let target_drift_report = artifact_dir.join(TARGET_DRIFT_REPORT_FILE);
        target_report.save_html(&target_drift_report)?;

        let mode = self.config.drift_extraction;
        let feature_drift = extract_drift(&data_report.as_dict(), &mapping.features(), mode)?;
        let target_drift = extract_target_drift(&target_report.as_dict(), mode)?;
        if feature_drift.is_empty() {
            self.log.warning("Feature drift scores unavailable for this run");
        }
        if data_report.dataset_drift() {
            self.log.warning(&format!(
                "Dataset drift detected: {}/{} features drifted",
                data_report.drifted_count(),
                data_report.columns().len()
            ));
        }

        Ok(RunArtifacts {
            metrics: RunMetrics {
                evaluation,
                feature_drift,
                target_drift,
            },
            dataset_drift: data_report.dataset_drift(),
            data_drift_report,
            target_drift_report,
            model_path,
        })
    }

    fn record_monitor_metrics(&mut self, metrics: &RunMetrics) -> Result<()> {
        for (name, value) in metrics.evaluation.as_map() {
            self.monitor.monitor(&name, value)?;
        }
        for (name, value) in drift_metric_map(metrics, MONITOR_DRIFT_PREFIX) {
            self.monitor.monitor(&name, value)?;
        }
        Ok(())
    }

    fn push(&self, metrics: &RunMetrics) -> Result<()> {
        let Some(aggregator) = &self.aggregator else {
            debug!("No push endpoint configured, skipping metrics push");
            return Ok(());
        };
        let batch = model_report_batch(&self.config.push.job, metrics);
        aggregator
            .submit(&batch)
            .context("Failed to push model metrics")?;
        self.log.info(&format!(
            "Pushed model metrics to {} as job {}",
            aggregator.endpoint(),
            batch.job()
        ));
        Ok(())
    }

    fn tracked_run(
        &self,
        tracker: &dyn ExperimentTracker,
        run: &RunInfo,
        local: &RunArtifacts,
    ) -> Result<Vec<ArtifactInfo>> {
        let dataset = &self.config.dataset;
        tracker.log_param(&run.run_id, "model_type", RegressionModel::NAME)?;
        tracker.log_param(&run.run_id, "test_size", &dataset.test_size.to_string())?;
        tracker.log_param(&run.run_id, "random_state", &dataset.random_state.to_string())?;

        tracker.log_metrics(&run.run_id, &local.metrics.evaluation.as_map())?;
        tracker.log_metrics(&run.run_id, &drift_metric_map(&local.metrics, ""))?;

        tracker.log_artifact(run, &local.model_path, MODEL_ARTIFACT_PATH)?;
        tracker.log_artifact(run, &local.data_drift_report, DATA_DRIFT_ARTIFACT_PATH)?;
        tracker.log_artifact(run, &local.target_drift_report, TARGET_DRIFT_ARTIFACT_PATH)?;

        self.push(&local.metrics)?;

        let artifacts = tracker.list_artifacts(&run.run_id, DATA_DRIFT_ARTIFACT_PATH)?;
        for artifact in &artifacts {
            self.log.info(&format!(
                "Artifact: {} ({} bytes)",
                artifact.path,
                artifact
                    .file_size
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ));
        }
        Ok(artifacts)
    }
}

/// Ends `run` as FINISHED or FAILED depending on `body`. A failed body's
/// error is returned even if ending the run fails too.
fn finish_run(
    log: &LogHandle,
    tracker: &dyn ExperimentTracker,
    run: &RunInfo,
    body: Result<Vec<ArtifactInfo>>,
) -> Result<(Option<String>, Vec<ArtifactInfo>)> {
    match body {
        Ok(artifacts) => {
            tracker
                .end_run(&run.run_id, RunStatus::Finished)
                .context("Failed to end tracker run")?;
            Ok((Some(run.run_id.clone()), artifacts))
        }
        Err(e) => {
            log.error(&format!("Run {} failed: {:#}", run.run_id, e));
            if let Err(end_err) = tracker.end_run(&run.run_id, RunStatus::Failed) {
                log.warning(&format!("Could not mark run {} as failed: {}", run.run_id, end_err));
            }
            Err(e)
        }
    }
}
