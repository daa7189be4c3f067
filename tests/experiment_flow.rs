use ml_monitor::application::Experiment;
use ml_monitor::config::{Config, MonitorConfig};
use ml_monitor::domain::drift::ExtractionMode;
use ml_monitor::domain::errors::TrackingError;
use ml_monitor::domain::ports::{ArtifactInfo, ExperimentTracker, RunInfo, RunStatus};
use ml_monitor::infrastructure::observability::{
    LogHandle, MetricsAggregator, MetricsError, Monitor, PushTransport,
};
use prometheus::proto::MetricFamily;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const CONDS: [&str; 3] = ["Clear", "Rain", "Haze"];
const WIND: [(&str, &str); 4] = [("0", "North"), ("90", "East"), ("180", "South"), ("270", "West")];

/// Deterministic weather rows; `hum_shift` moves the humidity distribution.
fn weather_csv(rows: usize, hum_shift: f64) -> String {
    let mut csv = String::from("datetimeutc,dewptm,hum,pressurem,conds,wdird,wdire,tempm\n");
    for i in 0..rows {
        let dewptm = (i % 17) as f64 * 0.5 + 5.0;
        let hum = 40.0 + ((i * 7) % 50) as f64 + hum_shift;
        let pressurem = 1000.0 + ((i * 3) % 20) as f64;
        let conds = CONDS[i % 3];
        let (wdird, wdire) = WIND[i % 4];
        let rain = if conds == "Rain" { -1.0 } else { 0.0 };
        let noise = ((i * 13) % 7) as f64 * 0.1;
        let tempm = 0.5 * dewptm + 0.1 * hum + 0.05 * (pressurem - 1000.0) + rain + noise;
        // one gap per dataset exercises imputation
        let hum_cell = if i == 5 { String::new() } else { hum.to_string() };
        let _ = writeln!(
            csv,
            "2024-01-01 {:02}:00,{},{},{},{},{},{},{}",
            i % 24,
            dewptm,
            hum_cell,
            pressurem,
            conds,
            wdird,
            wdire,
            tempm
        );
    }
    csv
}

#[derive(Default)]
struct RecordingTracker {
    params: RefCell<Vec<(String, String)>>,
    metrics: RefCell<BTreeMap<String, f64>>,
    artifacts: RefCell<Vec<(PathBuf, String)>>,
    ended: RefCell<Vec<RunStatus>>,
}

impl ExperimentTracker for RecordingTracker {
    fn start_run(&self, experiment: &str) -> Result<RunInfo, TrackingError> {
        assert_eq!(experiment, "lrgn_model");
        Ok(RunInfo {
            run_id: "run-1".to_string(),
            experiment_id: "1".to_string(),
            artifact_uri: "mlflow-artifacts:/1/run-1/artifacts".to_string(),
        })
    }

    fn log_param(&self, _run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.params
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn log_metrics(&self, _run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<(), TrackingError> {
        self.metrics.borrow_mut().extend(metrics.clone());
        Ok(())
    }

    fn log_artifact(&self, _run: &RunInfo, local_path: &Path, artifact_path: &str) -> Result<(), TrackingError> {
        self.artifacts
            .borrow_mut()
            .push((local_path.to_path_buf(), artifact_path.to_string()));
        Ok(())
    }

    fn list_artifacts(&self, _run_id: &str, path: &str) -> Result<Vec<ArtifactInfo>, TrackingError> {
        Ok(self
            .artifacts
            .borrow()
            .iter()
            .filter(|(_, artifact_path)| artifact_path == path)
            .map(|(local, artifact_path)| ArtifactInfo {
                path: format!(
                    "{}/{}",
                    artifact_path,
                    local.file_name().unwrap_or_default().to_string_lossy()
                ),
                is_dir: false,
                file_size: std::fs::metadata(local).ok().map(|m| m.len()),
            })
            .collect())
    }

    fn end_run(&self, _run_id: &str, status: RunStatus) -> Result<(), TrackingError> {
        self.ended.borrow_mut().push(status);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingTransport {
    pushes: Rc<RefCell<Vec<(String, usize)>>>,
}

impl PushTransport for RecordingTransport {
    fn push(&self, job: &str, _endpoint: &str, families: Vec<MetricFamily>) -> Result<(), MetricsError> {
        self.pushes.borrow_mut().push((job.to_string(), families.len()));
        Ok(())
    }
}

struct Fixture {
    root: PathBuf,
    config: Config,
}

impl Fixture {
    fn new(production_shift: f64) -> Self {
        let root = std::env::temp_dir().join(format!("ml_monitor_flow_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("reference.csv"), weather_csv(60, 0.0)).unwrap();
        std::fs::write(root.join("production.csv"), weather_csv(60, production_shift)).unwrap();

        let mut config = Config::from_lookup(&|_: &str| -> Option<String> { None }).unwrap();
        config.dataset.reference_path = root.join("reference.csv");
        config.dataset.production_path = root.join("production.csv");
        config.artifact_dir = root.join("artifacts");
        config.drift_extraction = ExtractionMode::Strict;
        Self { root, config }
    }

    fn monitor(&self) -> Monitor {
        Monitor::new(MonitorConfig {
            log_level: "debug".to_string(),
            log_dir: Some(self.root.join("logs")),
            push: None,
        })
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[test]
fn test_full_run_with_tracker_and_push() {
    let fixture = Fixture::new(30.0);
    let tracker = RecordingTracker::default();
    let transport = RecordingTransport::default();
    let log = LogHandle::null();

    let mut experiment = Experiment::new(fixture.config.clone(), &log, fixture.monitor())
        .with_tracker(&tracker)
        .with_aggregator(MetricsAggregator::with_transport(
            "localhost:9091",
            Box::new(transport.clone()),
        ));
    let outcome = experiment.run().unwrap();

    // local artifacts
    assert!(outcome.data_drift_report.exists());
    assert!(outcome.target_drift_report.exists());
    assert!(outcome.model_path.exists());
    assert!(outcome.data_drift_report.ends_with("data_drift_report.html"));

    // model metrics
    let eval = outcome.metrics.evaluation;
    assert!(eval.mse.is_finite());
    assert!(eval.r2.is_finite());

    // drift: humidity was shifted, so it must be flagged
    assert_eq!(outcome.metrics.feature_drift.len(), 6);
    assert!(outcome.metrics.feature_drift["hum"] < 0.05);
    assert!(outcome.metrics.target_drift.is_some());

    // one push with the model batch
    let pushes = transport.pushes.borrow();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "model_metrics");
    assert_eq!(pushes[0].1, 5);

    // tracker saw the whole run and finished it
    assert_eq!(outcome.run_id.as_deref(), Some("run-1"));
    assert_eq!(*tracker.ended.borrow(), vec![RunStatus::Finished]);
    assert!(
        tracker
            .params
            .borrow()
            .contains(&("model_type".to_string(), "LinearRegression".to_string()))
    );
    let logged = tracker.metrics.borrow();
    for key in ["mse", "r2_score", "accuracy", "hum", "conds", "target_drift"] {
        assert!(logged.contains_key(key), "missing tracker metric {key}");
    }
    assert!(!logged.contains_key("drift_hum"));
    let artifact_paths: Vec<String> = tracker
        .artifacts
        .borrow()
        .iter()
        .map(|(_, p)| p.clone())
        .collect();
    assert_eq!(artifact_paths, vec!["model", "drift_report", "target_drift_report"]);
    assert_eq!(outcome.artifacts.len(), 1);
    assert_eq!(outcome.artifacts[0].path, "drift_report/data_drift_report.html");

    // monitor gauges
    let monitor = experiment.monitor();
    assert_eq!(monitor.value("mse"), Some(eval.mse));
    assert_eq!(monitor.value("r2_score"), Some(eval.r2));
    assert!(monitor.value("drift_hum").is_some());
    assert!(monitor.value("target_drift").is_some());
}

#[test]
fn test_run_without_tracker_still_pushes() {
    let fixture = Fixture::new(0.0);
    let transport = RecordingTransport::default();
    let log = LogHandle::null();

    let mut experiment = Experiment::new(fixture.config.clone(), &log, fixture.monitor())
        .with_aggregator(MetricsAggregator::with_transport(
            "localhost:9091",
            Box::new(transport.clone()),
        ));
    let outcome = experiment.run().unwrap();

    assert!(outcome.run_id.is_none());
    assert!(!outcome.dataset_drift);
    assert_eq!(transport.pushes.borrow().len(), 1);
}

#[test]
fn test_missing_production_file_fails_run() {
    let mut fixture = Fixture::new(0.0);
    fixture.config.dataset.production_path = fixture.root.join("absent.csv");
    let log = LogHandle::null();

    let mut experiment = Experiment::new(fixture.config.clone(), &log, fixture.monitor());
    let err = experiment.run().unwrap_err();
    assert!(format!("{:#}", err).contains("production data"));
}
