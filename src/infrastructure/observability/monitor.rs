//! Monitoring agent
//!
//! Keeps one gauge per monitored name in its own registry. `start` configures
//! the process-wide logging facade; `stop` pushes the registry once when a
//! push endpoint is configured.

use super::logging::{self, LogSink};
use super::metrics::{self, MetricsError};
use super::push::MetricsAggregator;
use crate::config::MonitorConfig;
use prometheus::{Gauge, Registry};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

pub struct Monitor {
    config: MonitorConfig,
    registry: Registry,
    gauges: HashMap<String, Gauge>,
    aggregator: Option<MetricsAggregator>,
    state: MonitorState,
}

impl Monitor {
    /// Builds a monitor; pushes go to the Pushgateway from `config.push`.
    pub fn new(config: MonitorConfig) -> Self {
        let aggregator = config
            .push
            .as_ref()
            .map(|push| MetricsAggregator::new(push.endpoint.clone()));
        Self::with_aggregator(config, aggregator)
    }

    pub fn with_aggregator(config: MonitorConfig, aggregator: Option<MetricsAggregator>) -> Self {
        Self {
            config,
            registry: metrics::new_registry(),
            gauges: HashMap::new(),
            aggregator,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.state == MonitorState::Running {
            return Ok(());
        }
        logging::configure(
            &self.config.log_level,
            LogSink::from_dir(self.config.log_dir.clone()),
        )?;
        self.state = MonitorState::Running;
        logging::info("Monitor started");
        info!("Monitor: started (level {})", self.config.log_level);
        Ok(())
    }

    /// Sets gauge `name` to `value`, declaring it on first use.
    pub fn monitor(&mut self, name: &str, value: f64) -> Result<(), MetricsError> {
        let metric_name = metrics::sanitize_name(name);
        if !self.gauges.contains_key(&metric_name) {
            let gauge = metrics::get_gauge(&metric_name, Some(&self.registry))?;
            self.gauges.insert(metric_name.clone(), gauge);
        }
        if let Some(gauge) = self.gauges.get(&metric_name) {
            gauge.set(value);
        }
        logging::debug(&format!("{} = {}", metric_name, value));
        debug!("Monitor: {} = {}", metric_name, value);
        Ok(())
    }

    /// Current value of a monitored gauge.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.gauges.get(&metrics::sanitize_name(name)).map(Gauge::get)
    }

    pub fn render(&self) -> String {
        metrics::render(&self.registry)
    }

    /// Pushes the monitor registry and stops. A monitor that never started
    /// stops without pushing.
    pub fn stop(&mut self) -> Result<(), MetricsError> {
        if self.state != MonitorState::Running {
            return Ok(());
        }
        self.state = MonitorState::Stopped;

        match (&self.aggregator, &self.config.push) {
            (Some(aggregator), Some(push)) => {
                aggregator.submit_registry(&push.job, &self.registry)?;
                info!(
                    "Monitor: pushed {} gauge(s) to {}",
                    self.gauges.len(),
                    aggregator.endpoint()
                );
            }
            (Some(_), None) => warn!("Monitor: aggregator set without a push job, skipping push"),
            _ => {}
        }
        logging::info("Monitor stopped");
        Ok(())
    }
}
