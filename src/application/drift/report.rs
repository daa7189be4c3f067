use super::html;
use super::stattests::{
    chi_square, jensen_shannon, ks_2samp, value_counts, wasserstein_normed, z_test,
};
use crate::domain::dataset::{ColumnKind, ColumnMapping, Dataset};
use crate::domain::drift::{ColumnDrift, DATASET_DRIFT_SHARE, StatTest};
use crate::domain::errors::DriftError;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Per-feature drift of a production dataset against its reference
#[derive(Debug, Clone)]
pub struct DataDriftReport {
    reference_rows: usize,
    current_rows: usize,
    columns: Vec<ColumnDrift>,
}

impl DataDriftReport {
    /// Tests every feature in `mapping` (numeric features first).
    pub fn run(
        reference: &Dataset,
        current: &Dataset,
        mapping: &ColumnMapping,
    ) -> Result<Self, DriftError> {
        let mut columns = Vec::with_capacity(mapping.features().len());
        for name in &mapping.numerical_features {
            columns.push(numeric_drift(
                name,
                reference.numeric(name)?,
                current.numeric(name)?,
                reference.len(),
            )?);
        }
        for name in &mapping.categorical_features {
            columns.push(categorical_drift(
                name,
                reference.categorical(name)?,
                current.categorical(name)?,
                reference.len(),
            )?);
        }

        let report = Self {
            reference_rows: reference.len(),
            current_rows: current.len(),
            columns,
        };
        info!(
            "Data drift: {}/{} columns drifted (dataset drift: {})",
            report.drifted_count(),
            report.columns.len(),
            report.dataset_drift()
        );
        Ok(report)
    }

    pub fn columns(&self) -> &[ColumnDrift] {
        &self.columns
    }

    pub fn drifted_count(&self) -> usize {
        self.columns.iter().filter(|c| c.drift_detected).count()
    }

    pub fn share_of_drifted(&self) -> f64 {
        if self.columns.is_empty() {
            0.0
        } else {
            self.drifted_count() as f64 / self.columns.len() as f64
        }
    }

    pub fn dataset_drift(&self) -> bool {
        !self.columns.is_empty() && self.share_of_drifted() >= DATASET_DRIFT_SHARE
    }

    /// Report as a JSON dictionary:
    /// `{"metrics": [DatasetDriftMetric, DataDriftTable]}`.
    pub fn as_dict(&self) -> Value {
        let by_columns: Map<String, Value> = self
            .columns
            .iter()
            .map(|c| (c.column.clone(), column_json(c)))
            .collect();

        json!({
            "metrics": [
                {
                    "metric": "DatasetDriftMetric",
                    "result": {
                        "drift_share": DATASET_DRIFT_SHARE,
                        "number_of_columns": self.columns.len(),
                        "number_of_drifted_columns": self.drifted_count(),
                        "share_of_drifted_columns": self.share_of_drifted(),
                        "dataset_drift": self.dataset_drift(),
                    }
                },
                {
                    "metric": "DataDriftTable",
                    "result": {
                        "number_of_columns": self.columns.len(),
                        "number_of_drifted_columns": self.drifted_count(),
                        "share_of_drifted_columns": self.share_of_drifted(),
                        "dataset_drift": self.dataset_drift(),
                        "drift_by_columns": by_columns,
                    }
                }
            ]
        })
    }

    pub fn save_html(&self, path: &Path) -> Result<(), DriftError> {
        let summary = [
            ("Reference rows", self.reference_rows.to_string()),
            ("Current rows", self.current_rows.to_string()),
            ("Columns", self.columns.len().to_string()),
            ("Drifted columns", self.drifted_count().to_string()),
            (
                "Share of drifted columns",
                format!("{:.3}", self.share_of_drifted()),
            ),
            ("Dataset drift", self.dataset_drift().to_string()),
        ];
        let page = html::render("Data Drift Report", &summary, &self.columns);
        html::write(path, &page)
    }
}

/// Drift of the target column
#[derive(Debug, Clone)]
pub struct TargetDriftReport {
    reference_rows: usize,
    current_rows: usize,
    column: ColumnDrift,
}

impl TargetDriftReport {
    pub fn run(reference: &Dataset, current: &Dataset, target: &str) -> Result<Self, DriftError> {
        let column = numeric_drift(
            target,
            reference.numeric(target)?,
            current.numeric(target)?,
            reference.len(),
        )?;
        info!(
            "Target drift on {}: {} = {:.4} (detected: {})",
            target,
            column.stattest.name(),
            column.drift_score,
            column.drift_detected
        );
        Ok(Self {
            reference_rows: reference.len(),
            current_rows: current.len(),
            column,
        })
    }

    pub fn column(&self) -> &ColumnDrift {
        &self.column
    }

    /// Report as a JSON dictionary: `{"metrics": [ColumnDriftMetric]}`.
    pub fn as_dict(&self) -> Value {
        json!({
            "metrics": [
                {
                    "metric": "ColumnDriftMetric",
                    "result": column_json(&self.column),
                }
            ]
        })
    }

    pub fn save_html(&self, path: &Path) -> Result<(), DriftError> {
        let summary = [
            ("Target", self.column.column.clone()),
            ("Reference rows", self.reference_rows.to_string()),
            ("Current rows", self.current_rows.to_string()),
            ("Drift detected", self.column.drift_detected.to_string()),
        ];
        let page = html::render(
            "Target Drift Report",
            &summary,
            std::slice::from_ref(&self.column),
        );
        html::write(path, &page)
    }
}

fn column_json(c: &ColumnDrift) -> Value {
    json!({
        "column_name": c.column,
        "column_type": c.kind.as_str(),
        "stattest_name": c.stattest.name(),
        "stattest_threshold": c.stattest.threshold(),
        "drift_score": c.drift_score,
        "drift_detected": c.drift_detected,
    })
}

fn numeric_drift(
    column: &str,
    reference: &[Option<f64>],
    current: &[Option<f64>],
    reference_rows: usize,
) -> Result<ColumnDrift, DriftError> {
    let observed = |values: &[Option<f64>]| -> Vec<f64> {
        values.iter().flatten().copied().filter(|v| v.is_finite()).collect()
    };
    let r = observed(reference);
    let c = observed(current);
    ensure_non_empty(column, r.is_empty(), c.is_empty())?;

    let unique: BTreeSet<u64> = r.iter().chain(c.iter()).map(|v| v.to_bits()).collect();
    let test = StatTest::select(ColumnKind::Numerical, reference_rows, unique.len());
    debug!("{}: {} unique values, using {}", column, unique.len(), test.name());

    let score = match test {
        StatTest::KolmogorovSmirnov => ks_2samp(&r, &c).1,
        StatTest::Wasserstein => wasserstein_normed(&r, &c),
        _ => {
            let as_text = |values: &[f64]| -> Vec<String> {
                values.iter().map(f64::to_string).collect()
            };
            frequency_score(column, test, &as_text(&r), &as_text(&c))?
        }
    };
    Ok(ColumnDrift::new(column, ColumnKind::Numerical, test, score))
}

fn categorical_drift(
    column: &str,
    reference: &[Option<String>],
    current: &[Option<String>],
    reference_rows: usize,
) -> Result<ColumnDrift, DriftError> {
    let observed = |values: &[Option<String>]| -> Vec<String> {
        values.iter().flatten().cloned().collect()
    };
    let r = observed(reference);
    let c = observed(current);
    ensure_non_empty(column, r.is_empty(), c.is_empty())?;

    let unique: BTreeSet<&str> = r.iter().chain(c.iter()).map(String::as_str).collect();
    let test = StatTest::select(ColumnKind::Categorical, reference_rows, unique.len());
    debug!("{}: {} categories, using {}", column, unique.len(), test.name());

    let score = frequency_score(column, test, &r, &c)?;
    Ok(ColumnDrift::new(column, ColumnKind::Categorical, test, score))
}

fn frequency_score(
    column: &str,
    test: StatTest,
    reference: &[String],
    current: &[String],
) -> Result<f64, DriftError> {
    let r: BTreeMap<String, usize> = value_counts(reference.iter().map(String::as_str));
    let c: BTreeMap<String, usize> = value_counts(current.iter().map(String::as_str));
    let statistic_error = |reason: String| DriftError::Statistic {
        column: column.to_string(),
        reason,
    };

    match test {
        StatTest::ChiSquare => chi_square(&r, &c).map_err(statistic_error),
        StatTest::ZTest => z_test(&r, &c).map_err(statistic_error),
        StatTest::JensenShannon => Ok(jensen_shannon(&r, &c)),
        StatTest::KolmogorovSmirnov | StatTest::Wasserstein => Err(statistic_error(format!(
            "{} does not apply to frequency tables",
            test.name()
        ))),
    }
}

fn ensure_non_empty(column: &str, reference_empty: bool, current_empty: bool) -> Result<(), DriftError> {
    let side = match (reference_empty, current_empty) {
        (true, _) => "reference",
        (_, true) => "current",
        _ => return Ok(()),
    };
    Err(DriftError::EmptySample {
        column: column.to_string(),
        side,
    })
}
