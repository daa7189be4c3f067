//! Gauge factory
//!
//! Gauges are registered either in a caller-supplied registry or in the
//! process default registry. A name can only be registered once per registry;
//! callers that report repeatedly should take a fresh registry from
//! `new_registry()` each cycle.

use prometheus::{Gauge, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metric {name} is already registered in this registry")]
    Duplicate { name: String },

    #[error("Invalid metric {name}: {source}")]
    Declaration {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error("Push to {endpoint} failed: {reason}")]
    Push { endpoint: String, reason: String },
}

/// An isolated, empty registry.
pub fn new_registry() -> Registry {
    Registry::new()
}

/// Gauge `name` (help text = name) in `registry`, or in the default registry.
pub fn get_gauge(name: &str, registry: Option<&Registry>) -> Result<Gauge, MetricsError> {
    get_gauge_with_help(name, name, registry)
}

pub fn get_gauge_with_help(
    name: &str,
    help: &str,
    registry: Option<&Registry>,
) -> Result<Gauge, MetricsError> {
    let gauge = Gauge::with_opts(Opts::new(name, help)).map_err(|e| declaration_error(name, e))?;
    register(name, Box::new(gauge.clone()), registry)?;
    Ok(gauge)
}

/// Gauge family `name` with one sample per distinct label combination.
pub fn get_labeled_gauge(
    name: &str,
    help: &str,
    labels: &[&str],
    registry: Option<&Registry>,
) -> Result<GaugeVec, MetricsError> {
    let gauge =
        GaugeVec::new(Opts::new(name, help), labels).map_err(|e| declaration_error(name, e))?;
    register(name, Box::new(gauge.clone()), registry)?;
    Ok(gauge)
}

/// Prometheus text exposition of everything in `registry`.
pub fn render(registry: &Registry) -> String {
    TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap_or_default()
}

/// Replaces characters that are not valid in a metric name with `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) || out.is_empty() {
        out.insert(0, '_');
    }
    out
}

fn register(
    name: &str,
    collector: Box<dyn prometheus::core::Collector>,
    registry: Option<&Registry>,
) -> Result<(), MetricsError> {
    let result = match registry {
        Some(registry) => registry.register(collector),
        None => prometheus::register(collector),
    };
    result.map_err(|e| match e {
        prometheus::Error::AlreadyReg => MetricsError::Duplicate {
            name: name.to_string(),
        },
        other => declaration_error(name, other),
    })
}

fn declaration_error(name: &str, source: prometheus::Error) -> MetricsError {
    MetricsError::Declaration {
        name: name.to_string(),
        source,
    }
}
