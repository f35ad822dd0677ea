//! Constants for the TableScope API

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// SERVER
// ============================================================================

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

// ============================================================================
// DATABASE
// ============================================================================

pub const DEFAULT_DB_POOL_SIZE: usize = 16;

/// Pool wait timeout in seconds
pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// Per-statement timeout in milliseconds
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 30_000;
