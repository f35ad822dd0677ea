//! TableScope Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the API
//! layer and the PostgreSQL catalog.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, observe_catalog, TableScopeMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, LogFormat, TelemetryConfig};
