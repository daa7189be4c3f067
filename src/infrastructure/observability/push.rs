//! Batch metrics push
//!
//! A `MetricBatch` describes named scalar gauges and labeled gauge sets. Every
//! submission builds a brand-new registry from the batch, so a name is
//! declared exactly once and label series never leak between submissions.
//! The registry is sent in a single call and dropped.

use super::metrics::{self, MetricsError};
use prometheus::Registry;
use prometheus::proto::MetricFamily;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Label name used by `submit_batch` for labeled metric sets.
pub const DEFAULT_LABEL: &str = "feature";

#[derive(Debug, Clone, PartialEq)]
struct ScalarMetric {
    help: String,
    value: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct LabeledMetric {
    help: String,
    label: String,
    samples: BTreeMap<String, f64>,
}

/// Metrics to push together under one job name
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBatch {
    job: String,
    scalars: BTreeMap<String, ScalarMetric>,
    labeled: BTreeMap<String, LabeledMetric>,
}

impl MetricBatch {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            scalars: BTreeMap::new(),
            labeled: BTreeMap::new(),
        }
    }

    /// Adds a scalar gauge. A later call with the same name replaces the value.
    pub fn scalar(mut self, name: &str, help: &str, value: f64) -> Self {
        self.scalars.insert(
            name.to_string(),
            ScalarMetric {
                help: help.to_string(),
                value,
            },
        );
        self
    }

    /// Adds a gauge family with one sample per `samples` entry, keyed by
    /// the value of `label`.
    pub fn labeled(
        mut self,
        name: &str,
        help: &str,
        label: &str,
        samples: BTreeMap<String, f64>,
    ) -> Self {
        self.labeled.insert(
            name.to_string(),
            LabeledMetric {
                help: help.to_string(),
                label: label.to_string(),
                samples,
            },
        );
        self
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn scalar_count(&self) -> usize {
        self.scalars.len()
    }

    pub fn labeled_sample_count(&self) -> usize {
        self.labeled.values().map(|m| m.samples.len()).sum()
    }
}

/// Delivers gathered metric families to a push endpoint.
pub trait PushTransport {
    fn push(&self, job: &str, endpoint: &str, families: Vec<MetricFamily>)
    -> Result<(), MetricsError>;
}

/// Prometheus Pushgateway transport (`PUT /metrics/job/<job>`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PushGateway;

impl PushTransport for PushGateway {
    fn push(
        &self,
        job: &str,
        endpoint: &str,
        families: Vec<MetricFamily>,
    ) -> Result<(), MetricsError> {
        prometheus::push_metrics(job, HashMap::new(), endpoint, families, None).map_err(|e| {
            MetricsError::Push {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

pub struct MetricsAggregator {
    endpoint: String,
    transport: Box<dyn PushTransport>,
}

impl MetricsAggregator {
    /// Aggregator pushing to a Pushgateway at `endpoint` (`host:port` or URL).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_transport(endpoint, Box::new(PushGateway))
    }

    pub fn with_transport(endpoint: impl Into<String>, transport: Box<dyn PushTransport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Declares and sets every metric of `batch` in a fresh registry.
    pub fn build_registry(batch: &MetricBatch) -> Result<Registry, MetricsError> {
        let registry = metrics::new_registry();

        for (name, metric) in &batch.scalars {
            let gauge = metrics::get_gauge_with_help(name, &metric.help, Some(&registry))?;
            gauge.set(metric.value);
        }

        for (name, metric) in &batch.labeled {
            let gauge = metrics::get_labeled_gauge(
                name,
                &metric.help,
                &[metric.label.as_str()],
                Some(&registry),
            )?;
            for (label_value, value) in &metric.samples {
                gauge.with_label_values(&[label_value.as_str()]).set(*value);
            }
        }

        Ok(registry)
    }

    /// Builds a fresh registry from `batch` and pushes it in one call.
    pub fn submit(&self, batch: &MetricBatch) -> Result<(), MetricsError> {
        let registry = Self::build_registry(batch)?;
        debug!(
            "MetricsAggregator: pushing {} scalar(s), {} labeled sample(s) as job {}",
            batch.scalar_count(),
            batch.labeled_sample_count(),
            batch.job()
        );
        self.transport
            .push(batch.job(), &self.endpoint, registry.gather())?;
        info!(
            "MetricsAggregator: pushed job {} to {}",
            batch.job(),
            self.endpoint
        );
        Ok(())
    }

    /// Pushes an already populated registry, e.g. a long-lived agent registry.
    pub fn submit_registry(&self, job: &str, registry: &Registry) -> Result<(), MetricsError> {
        self.transport.push(job, &self.endpoint, registry.gather())
    }
}

/// Pushes scalar metrics and `feature`-labeled metric sets to a Pushgateway
/// as a single batch. Help text defaults to the metric name.
pub fn submit_batch(
    job: &str,
    endpoint: &str,
    scalar_metrics: &BTreeMap<String, f64>,
    labeled_metric_sets: &BTreeMap<String, BTreeMap<String, f64>>,
) -> Result<(), MetricsError> {
    MetricsAggregator::new(endpoint).submit(&batch_from_maps(
        job,
        scalar_metrics,
        labeled_metric_sets,
    ))
}

pub fn batch_from_maps(
    job: &str,
    scalar_metrics: &BTreeMap<String, f64>,
    labeled_metric_sets: &BTreeMap<String, BTreeMap<String, f64>>,
) -> MetricBatch {
    let batch = scalar_metrics
        .iter()
        .fold(MetricBatch::new(job), |batch, (name, value)| {
            batch.scalar(name, name, *value)
        });
    labeled_metric_sets
        .iter()
        .fold(batch, |batch, (name, samples)| {
            batch.labeled(name, name, DEFAULT_LABEL, samples.clone())
        })
}
