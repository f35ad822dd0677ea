//! Prometheus Metrics Definitions
//!
//! HTTP request metrics and catalog operation metrics, registered in the
//! default registry and exposed on `/metrics`.

use std::future::Future;
use std::time::Instant;

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use tablescope_core::BrowseResult;

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Catalog operation latency buckets (seconds). Row fetches can run up to
/// the statement timeout.
const CATALOG_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<TableScopeMetrics>> = Lazy::new(TableScopeMetrics::new);

/// Container for all TableScope metrics.
#[derive(Clone)]
pub struct TableScopeMetrics {
    /// HTTP request counter - labels: method, route, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, route, status
    pub http_request_duration_seconds: HistogramVec,

    /// Catalog operation counter - labels: operation, outcome
    pub catalog_operations_total: CounterVec,

    /// Catalog operation duration histogram - labels: operation, outcome
    pub catalog_operation_duration_seconds: HistogramVec,
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

impl TableScopeMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "tablescope_http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "tablescope_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "route", "status"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            catalog_operations_total: register_counter_vec!(
                "tablescope_catalog_operations_total",
                "Total number of catalog operations against the database",
                &["operation", "outcome"]
            )
            .map_err(|e| registration_error("catalog_operations_total", e))?,

            catalog_operation_duration_seconds: register_histogram_vec!(
                "tablescope_catalog_operation_duration_seconds",
                "Catalog operation duration in seconds",
                &["operation", "outcome"],
                CATALOG_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("catalog_operation_duration_seconds", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        let labels = [method, route, status_str.as_str()];
        self.http_requests_total.with_label_values(&labels).inc();
        self.http_request_duration_seconds
            .with_label_values(&labels)
            .observe(duration_secs);
    }

    /// Record a catalog operation.
    pub fn record_catalog_operation(&self, operation: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "error" };
        self.catalog_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.catalog_operation_duration_seconds
            .with_label_values(&[operation, outcome])
            .observe(duration_secs);
    }
}

/// Time `operation` and record its outcome.
pub async fn observe_catalog<T, F>(operation: &'static str, fut: F) -> BrowseResult<T>
where
    F: Future<Output = BrowseResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_catalog_operation(operation, result.is_ok(), start.elapsed().as_secs_f64());
    }
    result
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    if let Err(e) = METRICS.as_ref() {
        tracing::warn!(error = %e, "Metrics registry unavailable");
    }

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
