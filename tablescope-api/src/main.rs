//! TableScope API Server Entry Point
//!
//! Bootstraps configuration, builds the PostgreSQL catalog and the table
//! browser, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tablescope_api::constants::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use tablescope_api::telemetry::{init_tracer, TelemetryConfig};
use tablescope_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, BrowserConfig, DbClient,
    DbConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env()?;
    init_tracer(&telemetry_config)?;

    let db_config = DbConfig::from_env()?;
    let db = DbClient::from_config(&db_config)?;

    let browser = BrowserConfig::from_env()?.build(Arc::new(db))?;
    let api_config = ApiConfig::from_env();

    let app: Router = create_api_router(AppState::new(browser), &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting TableScope API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("TableScope API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("TABLESCOPE_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("TABLESCOPE_API_PORT").ok())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    let port = port_str
        .trim()
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_config(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_config(format!("Invalid bind address {}: {}", addr, e)))
}
