//! Prometheus Metrics Definitions
//!
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Global metrics instance, registered on first use.
pub static METRICS: Lazy<ApiResult<SmdMetrics>> = Lazy::new(SmdMetrics::new);

#[derive(Clone)]
pub struct SmdMetrics {
    /// Lifecycle operations - labels: operation, status
    pub lifecycle_operations_total: IntCounterVec,

    /// Lifecycle events - labels: outcome (queued/dropped/failed)
    pub lifecycle_events_total: IntCounterVec,

    /// Open event stream connections
    pub event_stream_subscribers: IntGauge,
}

impl SmdMetrics {
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            lifecycle_operations_total: register_int_counter_vec!(
                "smd_lifecycle_operations_total",
                "Total Component lifecycle operations",
                &["operation", "status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register lifecycle_operations_total: {}",
                    e
                ))
            })?,

            lifecycle_events_total: register_int_counter_vec!(
                "smd_lifecycle_events_total",
                "Lifecycle events by delivery outcome",
                &["outcome"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register lifecycle_events_total: {}", e))
            })?,

            event_stream_subscribers: register_int_gauge!(
                "smd_event_stream_subscribers",
                "Current number of event stream connections"
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register event_stream_subscribers: {}",
                    e
                ))
            })?,
        })
    }

    pub fn record_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.lifecycle_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    pub fn record_event(&self, outcome: &str) {
        self.lifecycle_events_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn stream_opened(&self) {
        self.event_stream_subscribers.inc();
    }

    pub fn stream_closed(&self) {
        self.event_stream_subscribers.dec();
    }
}

/// The registered metrics, or `None` if registration failed.
pub fn metrics() -> Option<&'static SmdMetrics> {
    METRICS.as_ref().ok()
}

/// Handler for GET /metrics. Returns Prometheus text format.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // make sure the SMD families exist even before the first operation
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
