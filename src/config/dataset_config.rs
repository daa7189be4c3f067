//! Dataset configuration parsing from environment variables.
//!
//! Input paths, column roles and the train/test split.

use super::{Lookup, list_or, parse_or, string_or};
use crate::domain::dataset::ColumnMapping;
use anyhow::Result;
use std::path::PathBuf;

/// Dataset environment configuration
#[derive(Debug, Clone)]
pub struct DatasetEnvConfig {
    pub reference_path: PathBuf,
    pub production_path: PathBuf,
    pub mapping: ColumnMapping,
    /// Fraction of reference rows held out for evaluation
    pub test_size: f64,
    pub random_state: u64,
}

impl DatasetEnvConfig {
    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let defaults = ColumnMapping::default();
        let numerical: Vec<&str> = defaults.numerical_features.iter().map(String::as_str).collect();
        let categorical: Vec<&str> =
            defaults.categorical_features.iter().map(String::as_str).collect();

        let mapping = ColumnMapping {
            numerical_features: list_or(lookup, "NUMERICAL_FEATURES", &numerical),
            categorical_features: list_or(lookup, "CATEGORICAL_FEATURES", &categorical),
            target: string_or(lookup, "TARGET_COLUMN", &defaults.target),
            datetime: string_or(lookup, "DATETIME_COLUMN", &defaults.datetime),
        };

        let test_size: f64 = parse_or(lookup, "TEST_SIZE", 0.2)?;
        if !(test_size > 0.0 && test_size < 1.0) {
            anyhow::bail!("TEST_SIZE must be in (0, 1), got {}", test_size);
        }

        Ok(Self {
            reference_path: PathBuf::from(string_or(
                lookup,
                "REFERENCE_DATA_PATH",
                "reference_data.csv",
            )),
            production_path: PathBuf::from(string_or(
                lookup,
                "PRODUCTION_DATA_PATH",
                "current_data.csv",
            )),
            mapping,
            test_size,
            random_state: parse_or(lookup, "RANDOM_STATE", 42)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::lookup_from;

    #[test]
    fn test_dataset_defaults() {
        let config = DatasetEnvConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.mapping, ColumnMapping::default());
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.reference_path, PathBuf::from("reference_data.csv"));
    }

    #[test]
    fn test_custom_columns() {
        let lookup = lookup_from(&[
            ("NUMERICAL_FEATURES", "a,b"),
            ("CATEGORICAL_FEATURES", ""),
            ("TARGET_COLUMN", "y"),
        ]);
        let config = DatasetEnvConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.mapping.numerical_features, vec!["a", "b"]);
        assert!(config.mapping.categorical_features.is_empty());
        assert_eq!(config.mapping.target, "y");
    }

    #[test]
    fn test_test_size_out_of_range() {
        let lookup = lookup_from(&[("TEST_SIZE", "1.5")]);
        assert!(DatasetEnvConfig::from_lookup(&lookup).is_err());
    }
}
