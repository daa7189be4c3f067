//! Metrics produced by one experiment run
//!
//! `RunMetrics` is what every sink receives: the tracker, the push gateway
//! batch and the monitoring agent.

use std::collections::BTreeMap;

/// Hold-out evaluation of a regression model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Mean squared error
    pub mse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// `1 - mean absolute error`, as a fraction
    pub accuracy: f64,
}

impl Evaluation {
    /// Computes hold-out metrics. Both slices must have the same, non-zero length.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Self {
        let n = y_true.len().min(y_pred.len());
        if n == 0 {
            return Self {
                mse: 0.0,
                r2: 0.0,
                accuracy: 0.0,
            };
        }
        let n_f = n as f64;

        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        let abs_err: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).abs())
            .sum();

        let mean = y_true[..n].iter().sum::<f64>() / n_f;
        let ss_tot: f64 = y_true[..n].iter().map(|t| (t - mean).powi(2)).sum();

        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mse: ss_res / n_f,
            r2,
            accuracy: 1.0 - abs_err / n_f,
        }
    }

    /// Accuracy expressed as a percentage
    pub fn accuracy_pct(&self) -> f64 {
        self.accuracy * 100.0
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("mse".to_string(), self.mse),
            ("r2_score".to_string(), self.r2),
            ("accuracy".to_string(), self.accuracy),
        ])
    }
}

/// Everything a run reports to its sinks
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetrics {
    pub evaluation: Evaluation,
    /// Drift score per feature; empty when extraction degraded
    pub feature_drift: BTreeMap<String, f64>,
    pub target_drift: Option<f64>,
}
