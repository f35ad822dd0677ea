//! TableScope API - HTTP Layer
//!
//! Serves the table browser over axum: a PostgreSQL [`Catalog`] backed by a
//! deadpool connection pool, JSON endpoints for listing tables and reading
//! pages, health checks, Prometheus metrics and an embedded viewer page.
//!
//! [`Catalog`]: tablescope_core::Catalog

pub mod config;
pub mod constants;
pub mod db;
pub mod decode;
pub mod error;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod validation;

pub use config::{ApiConfig, BrowserConfig};
pub use db::{DbClient, DbConfig, TlsMode};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
