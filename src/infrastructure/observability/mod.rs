//! Push-based observability for ml-monitor
//!
//! This module provides observability through **outbound data only** - no HTTP server,
//! no incoming requests:
//!
//! 1. **Logging facade**: `tracing` subscribers bound to a log directory or stderr
//! 2. **Gauge factory**: per-registry gauge declaration
//! 3. **Prometheus Pushgateway**: one fresh registry per pushed batch
//! 4. **Monitor agent**: long-lived gauges pushed when the agent stops

pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod push;

pub use logging::{LogHandle, LogSink, Severity};
pub use metrics::MetricsError;
pub use monitor::Monitor;
pub use push::{MetricBatch, MetricsAggregator, PushGateway, PushTransport};
