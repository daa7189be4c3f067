//! Linear regression experiment with drift monitoring
//!
//! Trains the model on the reference dataset, measures drift against the
//! production dataset and reports to MLflow and the Prometheus Pushgateway.

use anyhow::{Context, Result};
use clap::Parser;
use ml_monitor::application::Experiment;
use ml_monitor::config::{Config, MonitorConfig};
use ml_monitor::domain::drift::ExtractionMode;
use ml_monitor::infrastructure::MlflowClient;
use ml_monitor::infrastructure::observability::{
    LogHandle, LogSink, MetricsAggregator, Monitor, Severity,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Train, evaluate and monitor the regression model", long_about = None)]
struct Args {
    /// Reference dataset CSV (overrides REFERENCE_DATA_PATH)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Production dataset CSV (overrides PRODUCTION_DATA_PATH)
    #[arg(long)]
    production: Option<PathBuf>,

    /// Directory for reports and the model (overrides ARTIFACT_DIR)
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Monitor agent TOML config (overrides MONITOR_CONFIG)
    #[arg(long)]
    monitor_config: Option<PathBuf>,

    /// Fail the run when drift scores are missing from a report
    #[arg(long)]
    strict_drift: bool,

    /// Skip MLflow tracking
    #[arg(long)]
    no_tracking: bool,

    /// Skip the Pushgateway push
    #[arg(long)]
    no_push: bool,

    /// Log level: debug, info, warning, error (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    apply_overrides(&mut config, args);

    let severity = config
        .log_level
        .parse::<Severity>()
        .context("Invalid log level")?;
    let log = LogHandle::new(severity, LogSink::from_dir(config.log_dir.clone()))
        .context("Failed to open log sink")?;
    log.install_global().context("Failed to install logger")?;
    log.info("Starting lrgn experiment");

    let mut monitor_config = MonitorConfig::from_file(&config.monitor_config_path)?;
    if let Some(level) = &config.monitor_log_level {
        monitor_config = monitor_config.with_log_level(level.clone());
    }
    let monitor = Monitor::new(monitor_config);

    let tracker = if config.tracking.enabled {
        Some(MlflowClient::from_config(&config.tracking).context("Invalid MLflow configuration")?)
    } else {
        log.info("MLflow tracking disabled");
        None
    };
    let aggregator = config
        .push
        .enabled
        .then(|| MetricsAggregator::new(config.push.endpoint.clone()));

    let mut experiment = Experiment::new(config, &log, monitor);
    if let Some(client) = &tracker {
        experiment = experiment.with_tracker(client);
    }
    if let Some(aggregator) = aggregator {
        experiment = experiment.with_aggregator(aggregator);
    }

    let outcome = experiment.run()?;
    let eval = outcome.metrics.evaluation;
    log.info(&format!(
        "MSE {:.4} | R2 {:.4} | accuracy {:.2}% | dataset drift: {}",
        eval.mse,
        eval.r2,
        eval.accuracy_pct(),
        outcome.dataset_drift
    ));
    if let Some(run_id) = outcome.run_id {
        log.info(&format!("MLflow run: {}", run_id));
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, args: Args) {
    if let Some(path) = args.reference {
        config.dataset.reference_path = path;
    }
    if let Some(path) = args.production {
        config.dataset.production_path = path;
    }
    if let Some(dir) = args.artifact_dir {
        config.artifact_dir = dir;
    }
    if let Some(path) = args.monitor_config {
        config.monitor_config_path = path;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if args.strict_drift {
        config.drift_extraction = ExtractionMode::Strict;
    }
    if args.no_tracking {
        config.tracking.enabled = false;
    }
    if args.no_push {
        config.push.enabled = false;
    }
}
