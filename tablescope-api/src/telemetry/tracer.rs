//! Tracing Subscriber Initialization
//!
//! Installs an `EnvFilter`-driven subscriber writing either human-readable
//! or JSON lines to stdout.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{parse_var, read_var};
use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "tablescope_api=debug,tower_http=debug,info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{}', expected 'text' or 'json'",
                other
            )),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tablescope-api".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl TelemetryConfig {
    /// Create TelemetryConfig from environment variables.
    ///
    /// - `TABLESCOPE_SERVICE_NAME` (default: tablescope-api)
    /// - `TABLESCOPE_LOG_FORMAT`: text | json (default: text)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            service_name: read_var(&lookup, "TABLESCOPE_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            log_format: parse_var(&lookup, "TABLESCOPE_LOG_FORMAT", defaults.log_format)?,
        })
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called once at startup before any tracing occurs.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (json_layer, text_layer) = match config.log_format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Text => (None, Some(fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_telemetry_config_default() -> ApiResult<()> {
        let config = TelemetryConfig::from_vars(|_| None)?;
        assert_eq!(config.service_name, "tablescope-api");
        assert_eq!(config.log_format, LogFormat::Text);
        Ok(())
    }

    #[test]
    fn test_log_format_parsing() -> ApiResult<()> {
        let config = TelemetryConfig::from_vars(|key| {
            (key == "TABLESCOPE_LOG_FORMAT").then(|| "JSON".to_string())
        })?;
        assert_eq!(config.log_format, LogFormat::Json);

        let err = TelemetryConfig::from_vars(|key| {
            (key == "TABLESCOPE_LOG_FORMAT").then(|| "xml".to_string())
        })
        .expect_err("unknown format");
        assert_eq!(err.code, ErrorCode::InvalidConfig);
        Ok(())
    }
}
