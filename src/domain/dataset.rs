//! Columnar dataset model
//!
//! A `Dataset` holds only the columns named by a `ColumnMapping`: numeric
//! features and the target as `Option<f64>`, categorical features as
//! `Option<String>`, and the timestamp column as raw strings.

use crate::domain::errors::DatasetError;
use std::collections::BTreeMap;

/// Describes which columns play which role in an experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub numerical_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub target: String,
    pub datetime: String,
}

impl ColumnMapping {
    /// All feature columns, numeric first.
    pub fn features(&self) -> Vec<String> {
        self.numerical_features
            .iter()
            .chain(self.categorical_features.iter())
            .cloned()
            .collect()
    }

    /// Numeric columns the loader must parse, features then target.
    pub fn numeric_columns(&self) -> Vec<String> {
        let mut columns = self.numerical_features.clone();
        columns.push(self.target.clone());
        columns
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            numerical_features: vec!["dewptm".into(), "hum".into(), "pressurem".into()],
            categorical_features: vec!["conds".into(), "wdird".into(), "wdire".into()],
            target: "tempm".to_string(),
            datetime: "datetimeutc".to_string(),
        }
    }
}

/// Kind of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numerical,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Numerical => "num",
            ColumnKind::Categorical => "cat",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    len: usize,
    numeric: BTreeMap<String, Vec<Option<f64>>>,
    categorical: BTreeMap<String, Vec<Option<String>>>,
    timestamps: Vec<Option<String>>,
}

impl Dataset {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            ..Default::default()
        }
    }

    pub fn with_numeric(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.numeric.insert(name, values);
        Ok(self)
    }

    pub fn with_categorical(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<String>>,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.categorical.insert(name, values);
        Ok(self)
    }

    pub fn with_timestamps(
        mut self,
        name: &str,
        values: Vec<Option<String>>,
    ) -> Result<Self, DatasetError> {
        self.check_len(name, values.len())?;
        self.timestamps = values;
        Ok(self)
    }

    fn check_len(&self, column: &str, actual: usize) -> Result<(), DatasetError> {
        if actual != self.len {
            return Err(DatasetError::LengthMismatch {
                column: column.to_string(),
                expected: self.len,
                actual,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], DatasetError> {
        self.numeric
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn categorical(&self, name: &str) -> Result<&[Option<String>], DatasetError> {
        self.categorical
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn timestamps(&self) -> &[Option<String>] {
        &self.timestamps
    }

    /// Target column with missing cells rejected.
    pub fn target_values(&self, target: &str) -> Result<Vec<f64>, DatasetError> {
        self.numeric(target)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| DatasetError::InvalidNumber {
                    column: target.to_string(),
                    row: i + 1,
                    value: String::new(),
                })
            })
            .collect()
    }

    /// New dataset made of the given rows, in the given order.
    pub fn select(&self, rows: &[usize]) -> Dataset {
        let pick = |col: &Vec<Option<f64>>| -> Vec<Option<f64>> {
            rows.iter().map(|&i| col[i]).collect()
        };
        let pick_str = |col: &Vec<Option<String>>| -> Vec<Option<String>> {
            rows.iter().map(|&i| col[i].clone()).collect()
        };

        Dataset {
            len: rows.len(),
            numeric: self
                .numeric
                .iter()
                .map(|(k, v)| (k.clone(), pick(v)))
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|(k, v)| (k.clone(), pick_str(v)))
                .collect(),
            timestamps: if self.timestamps.is_empty() {
                Vec::new()
            } else {
                pick_str(&self.timestamps)
            },
        }
    }
}
