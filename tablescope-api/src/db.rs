//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`Catalog`] implementation the table browser runs against.
//!
//! Identifiers never reach SQL text from here: row queries arrive already
//! built, and catalog lookups bind schema and table as parameters.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime, SslMode,
};
use tablescope_core::{
    BrowseError, BrowseResult, Catalog, ColumnLabelMap, RawRows, RowQuery, RowQueryShape,
    TableIdentifier, TableName,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use crate::config::{parse_var, read_var};
use crate::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_DB_TIMEOUT_SECS, DEFAULT_STATEMENT_TIMEOUT_MS,
};
use crate::decode::decode_row;
use crate::error::{db_error_message, ApiError, ApiResult};
use crate::telemetry::observe_catalog;
use crate::validation::ValidateRange;

// ============================================================================
// CATALOG QUERIES
// ============================================================================

const LIST_TABLES_SQL: &str = "\
SELECT table_schema::text, table_name::text
FROM information_schema.tables
WHERE table_type = 'BASE TABLE'
  AND table_schema NOT IN ('pg_catalog', 'information_schema')
  AND table_schema NOT LIKE 'pg_toast%'
ORDER BY table_schema, table_name";

const COLUMN_COMMENTS_SQL: &str = "\
SELECT a.attname::text, col_description(c.oid, a.attnum)
FROM pg_catalog.pg_attribute a
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1
  AND c.relname = $2
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Transport security for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    Disable,
    /// Plaintext unless the server insists; the only fallback available
    /// without a TLS connector.
    #[default]
    Prefer,
    Require,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            other => Err(format!(
                "unknown ssl mode '{}', expected 'disable', 'prefer' or 'require'",
                other
            )),
        }
    }
}

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    pub ssl_mode: TlsMode,
    /// Maximum pool size
    pub max_size: usize,
    /// How long a request waits for a pooled connection
    pub timeout: Duration,
    /// Server-side bound on every statement; zero disables it
    pub statement_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            ssl_mode: TlsMode::default(),
            max_size: DEFAULT_DB_POOL_SIZE,
            timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
            statement_timeout: Duration::from_millis(DEFAULT_STATEMENT_TIMEOUT_MS),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// - `TABLESCOPE_DB_HOST`, `TABLESCOPE_DB_PORT`, `TABLESCOPE_DB_NAME`,
    ///   `TABLESCOPE_DB_USER`, `TABLESCOPE_DB_PASSWORD`
    /// - `TABLESCOPE_DB_SSLMODE`: disable | prefer | require (default: prefer)
    /// - `TABLESCOPE_DB_POOL_SIZE` (default: 16)
    /// - `TABLESCOPE_DB_TIMEOUT`: pool wait, seconds (default: 30)
    /// - `TABLESCOPE_DB_STATEMENT_TIMEOUT`: milliseconds (default: 30000)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let defaults = Self::default();
        let number = |key: &str| read_var(&lookup, key).and_then(|s| s.parse::<u64>().ok());

        let config = Self {
            host: read_var(&lookup, "TABLESCOPE_DB_HOST").unwrap_or(defaults.host),
            port: read_var(&lookup, "TABLESCOPE_DB_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: read_var(&lookup, "TABLESCOPE_DB_NAME").unwrap_or(defaults.dbname),
            user: read_var(&lookup, "TABLESCOPE_DB_USER").unwrap_or(defaults.user),
            password: lookup("TABLESCOPE_DB_PASSWORD").unwrap_or_default(),
            ssl_mode: parse_var(&lookup, "TABLESCOPE_DB_SSLMODE", defaults.ssl_mode)?,
            max_size: read_var(&lookup, "TABLESCOPE_DB_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: number("TABLESCOPE_DB_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            statement_timeout: number("TABLESCOPE_DB_STATEMENT_TIMEOUT")
                .map(Duration::from_millis)
                .unwrap_or(defaults.statement_timeout),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that would otherwise surface as confusing pool errors.
    pub fn validate(&self) -> ApiResult<()> {
        self.port.validate_range("TABLESCOPE_DB_PORT", 1, u16::MAX)?;
        self.max_size.validate_positive("TABLESCOPE_DB_POOL_SIZE")?;
        self.timeout.as_secs().validate_positive("TABLESCOPE_DB_TIMEOUT")?;
        Ok(())
    }

    /// Create a connection pool from this configuration.
    ///
    /// Connections are opened lazily, so this succeeds without a reachable
    /// server.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let ssl_mode = match self.ssl_mode {
            TlsMode::Disable => SslMode::Disable,
            TlsMode::Prefer => SslMode::Prefer,
            TlsMode::Require => {
                return Err(ApiError::invalid_config(
                    "TABLESCOPE_DB_SSLMODE=require is not supported: this build connects without TLS",
                ))
            }
        };

        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.ssl_mode = Some(ssl_mode);
        cfg.application_name = Some("tablescope".to_string());
        cfg.options = Some(format!(
            "-c statement_timeout={}",
            self.statement_timeout.as_millis()
        ));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::invalid_config(format!("Failed to create pool: {}", e)))?;

        tracing::info!(
            host = %self.host,
            port = self.port,
            dbname = %self.dbname,
            max_size = self.max_size,
            statement_timeout_ms = self.statement_timeout.as_millis() as u64,
            "Database pool configured"
        );

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and serves as the
/// browser's [`Catalog`].
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get a connection from the pool.
    pub async fn get_conn(&self) -> ApiResult<Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    async fn checkout(&self) -> BrowseResult<Object> {
        self.get_conn()
            .await
            .map_err(|e| BrowseError::query_failed(e.message))
    }
}

impl std::fmt::Debug for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("DbClient")
            .field("size", &status.size)
            .field("available", &status.available)
            .field("max_size", &status.max_size)
            .finish()
    }
}

fn query_failed(err: tokio_postgres::Error) -> BrowseError {
    BrowseError::query_failed(db_error_message(&err))
}

fn metadata_failed(err: tokio_postgres::Error) -> BrowseError {
    BrowseError::metadata_lookup_failed(db_error_message(&err))
}

/// Run a built row query on `conn`: render the statement if needed, then
/// prepare it so column names come back even when no rows do.
async fn run_row_query(conn: &Object, query: &RowQuery) -> BrowseResult<RawRows> {
    let statement_text = match query.shape {
        RowQueryShape::Rendered => {
            let params: Vec<&(dyn ToSql + Sync)> = query
                .params
                .iter()
                .map(|p| p as &(dyn ToSql + Sync))
                .collect();
            let row = conn
                .query_one(query.text.as_str(), &params)
                .await
                .map_err(query_failed)?;
            row.try_get::<_, String>(0).map_err(query_failed)?
        }
        RowQueryShape::Direct => query.text.clone(),
    };

    let statement = conn.prepare(&statement_text).await.map_err(query_failed)?;
    let columns = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let rows = conn.query(&statement, &[]).await.map_err(query_failed)?;

    let mut raw = RawRows::new(columns);
    for row in &rows {
        raw.push(decode_row(row).map_err(query_failed)?);
    }
    Ok(raw)
}

#[async_trait]
impl Catalog for DbClient {
    async fn list_tables(&self) -> BrowseResult<Vec<TableName>> {
        observe_catalog("list_tables", async {
            let conn = self.checkout().await?;
            let rows = conn.query(LIST_TABLES_SQL, &[]).await.map_err(query_failed)?;

            let mut tables = Vec::with_capacity(rows.len());
            for row in &rows {
                let schema: String = row.try_get(0).map_err(query_failed)?;
                let table: String = row.try_get(1).map_err(query_failed)?;
                tables.push(TableName::new(schema, table));
            }
            Ok::<_, BrowseError>(tables)
        })
        .await
    }

    async fn fetch_rows(&self, query: &RowQuery) -> BrowseResult<RawRows> {
        observe_catalog("fetch_rows", async {
            let in_flight = InFlight::new(self.checkout().await?);
            let result = match in_flight.conn() {
                Some(conn) => run_row_query(conn, query).await,
                None => Err(BrowseError::query_failed("connection released before the query ran")),
            };
            in_flight.release();

            if let Err(err) = &result {
                tracing::warn!(table = %query.table, error = %err, "Row fetch failed");
            }
            result
        })
        .await
    }

    async fn column_comments(&self, table: &TableIdentifier) -> BrowseResult<ColumnLabelMap> {
        observe_catalog("column_comments", async {
            let conn = self
                .get_conn()
                .await
                .map_err(|e| BrowseError::metadata_lookup_failed(e.message))?;
            let statement = conn
                .prepare_cached(COLUMN_COMMENTS_SQL)
                .await
                .map_err(metadata_failed)?;
            let rows = conn
                .query(&statement, &[&table.schema(), &table.table()])
                .await
                .map_err(metadata_failed)?;

            let mut labels = ColumnLabelMap::new();
            for row in &rows {
                let column: String = row.try_get(0).map_err(metadata_failed)?;
                let comment: Option<String> = row.try_get(1).map_err(metadata_failed)?;
                if let Some(comment) = comment {
                    labels.insert(column, comment);
                }
            }
            Ok::<_, BrowseError>(labels)
        })
        .await
    }

    async fn ping(&self) -> BrowseResult<()> {
        observe_catalog("ping", async {
            let conn = self.checkout().await?;
            conn.query_one("SELECT 1", &[]).await.map_err(query_failed)?;
            Ok::<_, BrowseError>(())
        })
        .await
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// A pooled connection with a statement in flight.
///
/// [`InFlight::release`] hands the connection back to the pool. Dropping
/// the guard instead (the request future was abandoned mid-fetch) cancels
/// the running statement and then detaches the connection from the pool,
/// so a later checkout can never receive a backend with a cancel request
/// still on its way.
struct InFlight {
    conn: Option<Object>,
}

impl InFlight {
    fn new(conn: Object) -> Self {
        Self { conn: Some(conn) }
    }

    fn conn(&self) -> Option<&Object> {
        self.conn.as_ref()
    }

    /// Return the connection to the pool.
    fn release(mut self) {
        drop(self.conn.take());
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let token = conn.cancel_token();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Row fetch abandoned, cancelling statement");
                handle.spawn(async move {
                    if let Err(e) = token.cancel_query(NoTls).await {
                        tracing::warn!(error = %e, "Failed to cancel abandoned statement");
                    }
                    drop(Object::take(conn));
                });
            }
            Err(_) => {
                tracing::warn!("Row fetch abandoned outside a runtime; closing connection");
                drop(Object::take(conn));
            }
        }
    }
}
