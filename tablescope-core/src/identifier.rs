//! Schema-qualified table identifiers
//!
//! Raw identifiers arrive from URL path segments as `schema.table` or a bare
//! `table`. [`IdentifierResolver`] turns them into a [`TableIdentifier`] whose
//! parts are guaranteed to match [`IDENTIFIER_ALLOW_LIST`]. Nothing in this
//! module produces SQL; quoting happens in [`crate::query`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BrowseError, BrowseResult};

/// Characters permitted in a decoded identifier: letters, digits, underscore,
/// space, dot and hyphen.
pub const IDENTIFIER_ALLOW_LIST: &str = r"^[A-Za-z0-9_ .-]+$";

/// SQL Server's default schema, kept for databases migrated from it.
pub const DBO_SCHEMA: &str = "dbo";

/// PostgreSQL's conventional default schema.
pub const PUBLIC_SCHEMA: &str = "public";

static ALLOWED: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(IDENTIFIER_ALLOW_LIST));

/// Check a decoded string against the identifier allow-list.
pub fn is_allowed(value: &str) -> bool {
    match ALLOWED.as_ref() {
        Ok(re) => re.is_match(value),
        // Unreachable with a constant pattern; fail closed.
        Err(_) => false,
    }
}

// ============================================================================
// TABLE IDENTIFIER
// ============================================================================

/// A validated (schema, table) pair.
///
/// Both parts are non-empty, trimmed, and contain only allow-listed
/// characters. The only way to build one is through [`IdentifierResolver`].
///
/// ```compile_fail
/// let id: tablescope_core::TableIdentifier =
///     serde_json::from_str(r#"{"schema":"dbo","table":"x;--"}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableIdentifier {
    schema: String,
    table: String,
}

impl TableIdentifier {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `schema.table`, the form used in responses and dictionary keys.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A table as enumerated by the catalog.
///
/// Unlike [`TableIdentifier`] this is not validated: the database may hold
/// tables whose names fall outside the allow-list, and they are still listed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Parses raw `schema.table` strings into [`TableIdentifier`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierResolver {
    default_schema: String,
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self {
            default_schema: PUBLIC_SCHEMA.to_string(),
        }
    }
}

impl IdentifierResolver {
    /// Create a resolver that assigns `default_schema` to bare table names.
    ///
    /// The default schema goes through the same allow-list as user input.
    pub fn new(default_schema: impl Into<String>) -> BrowseResult<Self> {
        let default_schema = default_schema.into().trim().to_string();
        if default_schema.is_empty() {
            return Err(BrowseError::invalid_identifier(
                "default schema must not be empty",
            ));
        }
        if !is_allowed(&default_schema) {
            return Err(BrowseError::invalid_identifier(format!(
                "default schema '{}' contains disallowed characters",
                default_schema
            )));
        }
        Ok(Self { default_schema })
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Resolve a raw identifier.
    ///
    /// Trims, percent-decodes, checks the allow-list, splits on the first
    /// `.` and trims both halves. A missing schema becomes the default.
    pub fn resolve(&self, raw: &str) -> BrowseResult<TableIdentifier> {
        let trimmed = raw.trim();
        let decoded = urlencoding::decode(trimmed).map_err(|_| {
            BrowseError::invalid_identifier("table identifier is not valid UTF-8 after decoding")
        })?;

        if decoded.is_empty() {
            return Err(BrowseError::invalid_identifier("table identifier is empty"));
        }
        if !is_allowed(&decoded) {
            return Err(BrowseError::invalid_identifier(
                "table identifier may only contain letters, digits, '_', ' ', '.' and '-'",
            ));
        }

        let (schema, table) = match decoded.split_once('.') {
            Some((schema, table)) => (schema.trim(), table.trim()),
            None => (self.default_schema.as_str(), decoded.trim()),
        };

        if schema.is_empty() || table.is_empty() {
            return Err(BrowseError::invalid_identifier(
                "schema and table must not be empty",
            ));
        }

        Ok(TableIdentifier {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }
}
