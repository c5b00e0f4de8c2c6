//! SMD2 Telemetry - logging and Prometheus metrics.

pub mod metrics;
pub mod tracer;

pub use metrics::{metrics_handler, SmdMetrics, METRICS};
pub use tracer::init_tracing;
