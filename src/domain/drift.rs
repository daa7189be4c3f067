//! Drift domain types
//!
//! Scores come in two flavours: p-values (drift when the score falls below
//! the threshold) and distances (drift when the score reaches the threshold).

use crate::domain::dataset::ColumnKind;
use std::str::FromStr;

/// Reference sample size above which distance tests replace p-value tests.
pub const LARGE_SAMPLE_ROWS: usize = 1000;

/// Columns with at most this many distinct values are tested as categories.
pub const MAX_CATEGORICAL_UNIQUE: usize = 5;

/// Share of drifted columns at which the whole dataset is flagged.
pub const DATASET_DRIFT_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatTest {
    KolmogorovSmirnov,
    ChiSquare,
    ZTest,
    Wasserstein,
    JensenShannon,
}

impl StatTest {
    /// Default test for a column, given the reference size and the number of
    /// distinct values across both samples.
    pub fn select(kind: ColumnKind, reference_rows: usize, unique_values: usize) -> Self {
        let small = reference_rows <= LARGE_SAMPLE_ROWS;
        match (kind, small) {
            (ColumnKind::Categorical, true) if unique_values <= 2 => StatTest::ZTest,
            (ColumnKind::Categorical, true) => StatTest::ChiSquare,
            (ColumnKind::Categorical, false) => StatTest::JensenShannon,
            (ColumnKind::Numerical, true) if unique_values <= MAX_CATEGORICAL_UNIQUE => {
                StatTest::ChiSquare
            }
            (ColumnKind::Numerical, true) => StatTest::KolmogorovSmirnov,
            (ColumnKind::Numerical, false) if unique_values <= MAX_CATEGORICAL_UNIQUE => {
                StatTest::JensenShannon
            }
            (ColumnKind::Numerical, false) => StatTest::Wasserstein,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StatTest::KolmogorovSmirnov => "K-S p_value",
            StatTest::ChiSquare => "chi-square p_value",
            StatTest::ZTest => "Z-test p_value",
            StatTest::Wasserstein => "Wasserstein distance (normed)",
            StatTest::JensenShannon => "Jensen-Shannon distance",
        }
    }

    pub fn threshold(self) -> f64 {
        if self.is_p_value() { 0.05 } else { 0.1 }
    }

    pub fn is_p_value(self) -> bool {
        matches!(
            self,
            StatTest::KolmogorovSmirnov | StatTest::ChiSquare | StatTest::ZTest
        )
    }

    /// Whether `score` indicates drift under this test's threshold.
    pub fn detects(self, score: f64) -> bool {
        if self.is_p_value() {
            score < self.threshold()
        } else {
            score >= self.threshold()
        }
    }
}

/// Drift result for a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrift {
    pub column: String,
    pub kind: ColumnKind,
    pub stattest: StatTest,
    pub drift_score: f64,
    pub drift_detected: bool,
}

impl ColumnDrift {
    pub fn new(column: impl Into<String>, kind: ColumnKind, stattest: StatTest, score: f64) -> Self {
        Self {
            column: column.into(),
            kind,
            stattest,
            drift_score: score,
            drift_detected: stattest.detects(score),
        }
    }
}

/// How drift scores are read back from a report dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// Missing structure fails the caller.
    Strict,
    /// Missing structure is logged and yields an empty result.
    #[default]
    Degraded,
}

impl FromStr for ExtractionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ExtractionMode::Strict),
            "degraded" => Ok(ExtractionMode::Degraded),
            _ => anyhow::bail!(
                "Invalid DRIFT_EXTRACTION: {}. Must be 'strict' or 'degraded'",
                s
            ),
        }
    }
}
