// Drift detection and report extraction
pub mod drift;

// Experiment orchestrator
pub mod experiment;

// Model training and evaluation
pub mod model;
pub mod preprocessing;

pub use experiment::{Experiment, ExperimentOutcome};

use crate::domain::metrics::RunMetrics;
use crate::infrastructure::observability::MetricBatch;
use crate::infrastructure::observability::push::DEFAULT_LABEL;
use std::collections::BTreeMap;

/// Push batch published for each run: model quality scalars, per-feature
/// drift labeled by `feature`, and target drift when available.
pub fn model_report_batch(job: &str, metrics: &RunMetrics) -> MetricBatch {
    let eval = &metrics.evaluation;
    let mut batch = MetricBatch::new(job)
        .scalar("model_mse", "Mean Squared Error of the model", eval.mse)
        .scalar("model_r2_score", "R^2 Score of the model", eval.r2)
        .scalar(
            "mlflow_prediction_accuracy",
            "Prediction Accuracy %",
            eval.accuracy_pct(),
        );

    if !metrics.feature_drift.is_empty() {
        batch = batch.labeled(
            "mlflow_feature_drift_over_time",
            "Feature Drift Over Time",
            DEFAULT_LABEL,
            metrics.feature_drift.clone(),
        );
    }
    if let Some(target) = metrics.target_drift {
        batch = batch.scalar(
            "mlflow_target_drift_over_time",
            "Target Drift Over Time",
            target,
        );
    }
    batch
}

/// Prefix for per-feature drift gauges on the monitor agent.
pub const MONITOR_DRIFT_PREFIX: &str = "drift_";

/// Drift scores keyed `<prefix><feature>`, plus `target_drift`.
///
/// The tracker logs bare feature names (empty prefix); the monitor agent
/// uses `MONITOR_DRIFT_PREFIX`.
pub fn drift_metric_map(metrics: &RunMetrics, prefix: &str) -> BTreeMap<String, f64> {
    let mut map: BTreeMap<String, f64> = metrics
        .feature_drift
        .iter()
        .map(|(feature, score)| (format!("{}{}", prefix, feature), *score))
        .collect();
    if let Some(target) = metrics.target_drift {
        map.insert("target_drift".to_string(), target);
    }
    map
}
