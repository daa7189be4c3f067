//! Feature preprocessing
//!
//! Numeric features: median imputation, then standard scaling.
//! Categorical features: most-frequent imputation, then one-hot encoding.
//! Output layout is all numeric columns (mapping order) followed by each
//! categorical column's one-hot block (categories sorted).

use crate::domain::dataset::{ColumnMapping, Dataset};
use crate::domain::errors::ModelError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct NumericColumn {
    name: String,
    median: f64,
    mean: f64,
    scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct CategoricalColumn {
    name: String,
    most_frequent: String,
    categories: Vec<String>,
}

/// Preprocessor fitted on a training dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    pub fn fit(dataset: &Dataset, mapping: &ColumnMapping) -> Result<Self, ModelError> {
        let numeric = mapping
            .numerical_features
            .iter()
            .map(|name| fit_numeric(name, dataset.numeric(name)?))
            .collect::<Result<Vec<_>, _>>()?;

        let categorical = mapping
            .categorical_features
            .iter()
            .map(|name| fit_categorical(name, dataset.categorical(name)?))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Width of a transformed row.
    pub fn n_features(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Names of the output columns, e.g. `hum` or `conds=Rain`.
    pub fn feature_names(&self) -> Vec<String> {
        let numeric = self.numeric.iter().map(|c| c.name.clone());
        let onehot = self.categorical.iter().flat_map(|c| {
            c.categories
                .iter()
                .map(move |cat| format!("{}={}", c.name, cat))
        });
        numeric.chain(onehot).collect()
    }

    pub fn transform(&self, dataset: &Dataset) -> Result<Vec<Vec<f64>>, ModelError> {
        let mut rows = vec![Vec::with_capacity(self.n_features()); dataset.len()];

        for column in &self.numeric {
            let values = dataset.numeric(&column.name)?;
            for (row, value) in rows.iter_mut().zip(values) {
                let v = value.unwrap_or(column.median);
                row.push((v - column.mean) / column.scale);
            }
        }

        for column in &self.categorical {
            let values = dataset.categorical(&column.name)?;
            for (row, value) in rows.iter_mut().zip(values) {
                let v = value.as_deref().unwrap_or(&column.most_frequent);
                // Unknown categories encode as all zeros.
                row.extend(
                    column
                        .categories
                        .iter()
                        .map(|cat| if cat == v { 1.0 } else { 0.0 }),
                );
            }
        }

        Ok(rows)
    }

    pub fn fit_transform(
        dataset: &Dataset,
        mapping: &ColumnMapping,
    ) -> Result<(Self, Vec<Vec<f64>>), ModelError> {
        let preprocessor = Self::fit(dataset, mapping)?;
        let rows = preprocessor.transform(dataset)?;
        Ok((preprocessor, rows))
    }
}

fn fit_numeric(name: &str, values: &[Option<f64>]) -> Result<NumericColumn, ModelError> {
    let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.is_empty() {
        return Err(ModelError::EmptyColumn {
            column: name.to_string(),
        });
    }
    observed.sort_by(f64::total_cmp);
    let median = median_of_sorted(&observed);

    // Scaling statistics are taken after imputation.
    let n = values.len() as f64;
    let imputed = values.iter().map(|v| v.unwrap_or(median));
    let mean = imputed.clone().sum::<f64>() / n;
    let variance = imputed.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    Ok(NumericColumn {
        name: name.to_string(),
        median,
        mean,
        scale: if std > 0.0 { std } else { 1.0 },
    })
}

fn fit_categorical(name: &str, values: &[Option<String>]) -> Result<CategoricalColumn, ModelError> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_default() += 1;
    }

    // BTreeMap iterates in sorted order, so ties keep the smallest value.
    let most_frequent = counts
        .iter()
        .fold(None::<(&str, usize)>, |best, (&cat, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((cat, count)),
        })
        .map(|(cat, _)| cat.to_string())
        .ok_or_else(|| ModelError::EmptyColumn {
            column: name.to_string(),
        })?;

    Ok(CategoricalColumn {
        name: name.to_string(),
        categories: counts.keys().map(|c| c.to_string()).collect(),
        most_frequent,
    })
}

pub(crate) fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
