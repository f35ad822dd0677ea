//! API Configuration Module
//!
//! CORS settings and browser settings (default schema, identifier quoting,
//! label strategy and dictionary). Everything is read from environment
//! variables once at startup. Numeric values fall back to their defaults
//! when unparsable; enumerated values are startup errors.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tablescope_core::{
    Catalog, IdentQuoting, IdentifierResolver, LabelDictionary, LabelResolver, LabelStrategy,
    TableBrowser, PUBLIC_SCHEMA,
};

use crate::constants::DEFAULT_CORS_MAX_AGE_SECS;
use crate::error::{ApiError, ApiResult};

/// Read a variable, treating blank values as unset.
pub(crate) fn read_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an enumerated variable, failing on unknown values.
pub(crate) fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> ApiResult<T>
where
    T: FromStr<Err = String>,
{
    match read_var(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: String| ApiError::invalid_config(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins. Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `TABLESCOPE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `TABLESCOPE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `TABLESCOPE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cors_origins = read_var(&lookup, "TABLESCOPE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = read_var(&lookup, "TABLESCOPE_CORS_ALLOW_CREDENTIALS")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let cors_max_age_secs = read_var(&lookup, "TABLESCOPE_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        }
    }

    /// Strict CORS is on when origins are configured.
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

// ============================================================================
// BROWSER CONFIGURATION
// ============================================================================

/// How identifiers are resolved and columns labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Schema for identifiers without one.
    pub default_schema: String,
    pub quoting: IdentQuoting,
    pub label_strategy: LabelStrategy,
    /// TOML or JSON label dictionary.
    pub labels_file: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            default_schema: PUBLIC_SCHEMA.to_string(),
            quoting: IdentQuoting::default(),
            label_strategy: LabelStrategy::default(),
            labels_file: None,
        }
    }
}

impl BrowserConfig {
    /// Create BrowserConfig from environment variables.
    ///
    /// - `TABLESCOPE_DEFAULT_SCHEMA` (default: public)
    /// - `TABLESCOPE_IDENT_QUOTING`: server | client (default: server)
    /// - `TABLESCOPE_LABEL_STRATEGY`: metadata | static | layered (default: layered)
    /// - `TABLESCOPE_LABELS_FILE`: path to a `.toml` or `.json` dictionary
    pub fn from_env() -> ApiResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            default_schema: read_var(&lookup, "TABLESCOPE_DEFAULT_SCHEMA")
                .unwrap_or(defaults.default_schema),
            quoting: parse_var(&lookup, "TABLESCOPE_IDENT_QUOTING", defaults.quoting)?,
            label_strategy: parse_var(&lookup, "TABLESCOPE_LABEL_STRATEGY", defaults.label_strategy)?,
            labels_file: read_var(&lookup, "TABLESCOPE_LABELS_FILE").map(PathBuf::from),
        })
    }

    /// Load the dictionary, if configured.
    pub fn load_dictionary(&self) -> ApiResult<LabelDictionary> {
        let dictionary = match &self.labels_file {
            Some(path) => LabelDictionary::load(path)?,
            None => LabelDictionary::new(),
        };
        if self.label_strategy == LabelStrategy::Static && dictionary.is_empty() {
            tracing::warn!(
                "Static label strategy with an empty dictionary; columns keep physical names"
            );
        }
        Ok(dictionary)
    }

    /// Build a browser over `catalog`.
    pub fn build(&self, catalog: Arc<dyn Catalog>) -> ApiResult<TableBrowser> {
        let resolver = IdentifierResolver::new(self.default_schema.as_str())
            .map_err(|e| ApiError::invalid_config(format!("TABLESCOPE_DEFAULT_SCHEMA: {}", e)))?;
        let dictionary = Arc::new(self.load_dictionary()?);

        tracing::info!(
            default_schema = resolver.default_schema(),
            quoting = ?self.quoting,
            label_strategy = ?self.label_strategy,
            dictionary_tables = dictionary.len(),
            "Table browser configured"
        );

        Ok(TableBrowser::new(
            catalog,
            resolver,
            LabelResolver::new(self.label_strategy, dictionary),
            self.quoting,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::from_vars(vars(&[]));
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert!(!config.is_production());
    }

    #[test]
    fn test_cors_origins_parsing() {
        let config = ApiConfig::from_vars(vars(&[
            ("TABLESCOPE_CORS_ORIGINS", "https://a.example, ,https://b.example"),
            ("TABLESCOPE_CORS_MAX_AGE_SECS", "not-a-number"),
        ]));
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert!(config.is_production());
    }

    #[test]
    fn test_browser_defaults() -> ApiResult<()> {
        let config = BrowserConfig::from_vars(vars(&[]))?;
        assert_eq!(config, BrowserConfig::default());
        assert_eq!(config.default_schema, "public");
        assert_eq!(config.quoting, IdentQuoting::Server);
        assert_eq!(config.label_strategy, LabelStrategy::Layered);
        Ok(())
    }

    #[test]
    fn test_browser_overrides() -> ApiResult<()> {
        let config = BrowserConfig::from_vars(vars(&[
            ("TABLESCOPE_DEFAULT_SCHEMA", "dbo"),
            ("TABLESCOPE_IDENT_QUOTING", "client"),
            ("TABLESCOPE_LABEL_STRATEGY", "static"),
            ("TABLESCOPE_LABELS_FILE", "labels/northwind.toml"),
        ]))?;
        assert_eq!(config.default_schema, "dbo");
        assert_eq!(config.quoting, IdentQuoting::Client);
        assert_eq!(config.label_strategy, LabelStrategy::Static);
        assert_eq!(config.labels_file, Some(PathBuf::from("labels/northwind.toml")));
        Ok(())
    }

    #[test]
    fn test_unknown_enum_value_is_error() {
        let err = BrowserConfig::from_vars(vars(&[("TABLESCOPE_LABEL_STRATEGY", "comments")]))
            .expect_err("unknown strategy");
        assert_eq!(err.code, ErrorCode::InvalidConfig);
        assert!(err.message.contains("TABLESCOPE_LABEL_STRATEGY"));
    }

    #[test]
    fn test_shipped_dictionary_loads() -> ApiResult<()> {
        let config = BrowserConfig {
            labels_file: Some(PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/labels/northwind.toml"
            ))),
            ..Default::default()
        };
        let dictionary = config.load_dictionary()?;
        assert_eq!(dictionary.len(), 8);
        Ok(())
    }
}
