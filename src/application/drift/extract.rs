//! Reading drift scores back out of report dictionaries

use crate::domain::drift::ExtractionMode;
use crate::domain::errors::DriftError;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

const DRIFT_TABLE_PATH: &str = "metrics[1].result.drift_by_columns";
const TARGET_SCORE_PATH: &str = "metrics[0].result.drift_score";

/// Drift score of each feature from a data drift dictionary.
///
/// In degraded mode any missing or malformed entry yields an empty map.
pub fn extract_drift(
    report: &Value,
    features: &[String],
    mode: ExtractionMode,
) -> Result<BTreeMap<String, f64>, DriftError> {
    match read_feature_scores(report, features) {
        Ok(scores) => Ok(scores),
        Err(e) => match mode {
            ExtractionMode::Strict => Err(e),
            ExtractionMode::Degraded => {
                warn!("Feature drift unavailable: {}", e);
                Ok(BTreeMap::new())
            }
        },
    }
}

/// Drift score of the target from a target drift dictionary.
pub fn extract_target_drift(report: &Value, mode: ExtractionMode) -> Result<Option<f64>, DriftError> {
    let score = report
        .get("metrics")
        .and_then(|m| m.get(0))
        .and_then(|m| m.get("result"))
        .and_then(|r| r.get("drift_score"))
        .ok_or_else(|| DriftError::MissingKey {
            path: TARGET_SCORE_PATH.to_string(),
        })
        .and_then(|v| as_score(v, TARGET_SCORE_PATH));

    match (score, mode) {
        (Ok(score), _) => Ok(Some(score)),
        (Err(e), ExtractionMode::Strict) => Err(e),
        (Err(e), ExtractionMode::Degraded) => {
            warn!("Target drift unavailable: {}", e);
            Ok(None)
        }
    }
}

fn read_feature_scores(
    report: &Value,
    features: &[String],
) -> Result<BTreeMap<String, f64>, DriftError> {
    let table = report
        .get("metrics")
        .and_then(|m| m.get(1))
        .and_then(|m| m.get("result"))
        .and_then(|r| r.get("drift_by_columns"))
        .ok_or_else(|| DriftError::MissingKey {
            path: DRIFT_TABLE_PATH.to_string(),
        })?;

    features
        .iter()
        .map(|feature| -> Result<(String, f64), DriftError> {
            let path = format!("{}.{}.drift_score", DRIFT_TABLE_PATH, feature);
            let value = table
                .get(feature)
                .and_then(|c| c.get("drift_score"))
                .ok_or_else(|| DriftError::MissingKey { path: path.clone() })?;
            Ok((feature.clone(), as_score(value, &path)?))
        })
        .collect()
}

fn as_score(value: &Value, path: &str) -> Result<f64, DriftError> {
    value.as_f64().ok_or_else(|| DriftError::NotANumber {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Runs `f` with a `tracing` subscriber writing into the returned buffer.
    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs.text())
    }

    fn features() -> Vec<String> {
        vec!["hum".to_string(), "conds".to_string()]
    }

    fn data_dict() -> Value {
        json!({
            "metrics": [
                {"metric": "DatasetDriftMetric", "result": {}},
                {"metric": "DataDriftTable", "result": {"drift_by_columns": {
                    "hum": {"drift_score": 0.25},
                    "conds": {"drift_score": 0.01},
                }}}
            ]
        })
    }

    #[test]
    fn test_extracts_every_feature() {
        let scores = extract_drift(&data_dict(), &features(), ExtractionMode::Strict).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["hum"], 0.25);
        assert_eq!(scores["conds"], 0.01);
    }

    #[test]
    fn test_missing_table_degraded_is_empty() {
        let dict = json!({"metrics": [{"result": {}}]});
        let scores = extract_drift(&dict, &features(), ExtractionMode::Degraded).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_missing_feature_strict_names_path() {
        let err = extract_drift(
            &data_dict(),
            &["pressurem".to_string()],
            ExtractionMode::Strict,
        )
        .unwrap_err();
        match err {
            DriftError::MissingKey { path } => {
                assert_eq!(path, "metrics[1].result.drift_by_columns.pressurem.drift_score")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_feature_degraded_drops_all() {
        let mut wanted = features();
        wanted.push("pressurem".to_string());
        let scores = extract_drift(&data_dict(), &wanted, ExtractionMode::Degraded).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_degraded_feature_extraction_logs_warning() {
        let (scores, logs) = with_captured_logs(|| {
            extract_drift(
                &data_dict(),
                &["pressurem".to_string()],
                ExtractionMode::Degraded,
            )
        });
        assert!(scores.unwrap().is_empty());
        assert!(logs.contains("WARN"), "no warning in: {logs}");
        assert!(logs.contains("Feature drift unavailable"));
        assert!(logs.contains("drift_by_columns.pressurem.drift_score"));
    }

    #[test]
    fn test_degraded_target_extraction_logs_warning() {
        let (score, logs) = with_captured_logs(|| {
            extract_target_drift(&json!({"metrics": []}), ExtractionMode::Degraded)
        });
        assert_eq!(score.unwrap(), None);
        assert!(logs.contains("WARN"), "no warning in: {logs}");
        assert!(logs.contains("Target drift unavailable"));
    }

    #[test]
    fn test_strict_extraction_does_not_warn() {
        let (result, logs) = with_captured_logs(|| {
            extract_target_drift(&json!({"metrics": []}), ExtractionMode::Strict)
        });
        assert!(result.is_err());
        assert!(!logs.contains("WARN"));
    }

    #[test]
    fn test_target_drift() {
        let dict = json!({"metrics": [{"result": {"drift_score": 0.4}}]});
        assert_eq!(
            extract_target_drift(&dict, ExtractionMode::Strict).unwrap(),
            Some(0.4)
        );

        let broken = json!({"metrics": []});
        assert_eq!(
            extract_target_drift(&broken, ExtractionMode::Degraded).unwrap(),
            None
        );
        assert!(matches!(
            extract_target_drift(&broken, ExtractionMode::Strict),
            Err(DriftError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_non_numeric_score() {
        let dict = json!({"metrics": [{"result": {"drift_score": "high"}}]});
        assert!(matches!(
            extract_target_drift(&dict, ExtractionMode::Strict),
            Err(DriftError::NotANumber { .. })
        ));
    }
}
