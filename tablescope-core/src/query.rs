//! Dynamic row-fetch query construction
//!
//! User-supplied identifiers never reach SQL text unquoted. With
//! [`IdentQuoting::Server`] they are bound parameters to PostgreSQL's
//! `format('%I')`, which returns the statement to run. With
//! [`IdentQuoting::Client`] they are re-validated and wrapped in double quotes
//! here. The row limit is always a validated integer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BrowseError, BrowseResult};
use crate::identifier::{is_allowed, TableIdentifier};

// ============================================================================
// ROW LIMIT
// ============================================================================

/// A row limit within `[RowLimit::MIN, RowLimit::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowLimit(u32);

impl RowLimit {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5000;
    pub const DEFAULT: RowLimit = RowLimit(100);

    /// Validate a raw limit. Out-of-range values fail with `OutOfRangeLimit`.
    pub fn new(value: i64) -> BrowseResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(BrowseError::OutOfRangeLimit {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RowLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// QUOTING
// ============================================================================

/// Where identifier quoting happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentQuoting {
    /// The database quotes bound parameters with `format('%I')`.
    #[default]
    Server,
    /// Identifiers are double-quoted before the statement is sent.
    Client,
}

impl FromStr for IdentQuoting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            other => Err(format!(
                "unknown identifier quoting '{}', expected 'server' or 'client'",
                other
            )),
        }
    }
}

/// Double-quote an identifier for PostgreSQL.
///
/// Re-checks the allow-list and refuses embedded `"` outright instead of
/// doubling it.
pub fn quote_ident(ident: &str) -> BrowseResult<String> {
    if ident.is_empty() {
        return Err(BrowseError::invalid_identifier("identifier must not be empty"));
    }
    if ident.contains('"') {
        return Err(BrowseError::invalid_identifier(
            "identifier must not contain a double quote",
        ));
    }
    if !is_allowed(ident) {
        return Err(BrowseError::invalid_identifier(format!(
            "identifier '{}' contains disallowed characters",
            ident
        )));
    }
    Ok(format!("\"{}\"", ident))
}

// ============================================================================
// ROW QUERY
// ============================================================================

/// How the catalog must run a [`RowQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowQueryShape {
    /// Running `text` with `params` yields one text cell: the statement to execute.
    Rendered,
    /// `text` is the statement itself.
    Direct,
}

/// Query text plus bound parameters for a row fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowQuery {
    pub table: TableIdentifier,
    pub text: String,
    pub params: Vec<String>,
    pub shape: RowQueryShape,
    pub limit: RowLimit,
}

/// Build the row-fetch query for `table` returning at most `limit` rows.
pub fn build_row_query(
    table: &TableIdentifier,
    limit: RowLimit,
    quoting: IdentQuoting,
) -> BrowseResult<RowQuery> {
    match quoting {
        IdentQuoting::Server => Ok(RowQuery {
            table: table.clone(),
            text: format!(
                "SELECT format('SELECT * FROM %I.%I LIMIT {}', $1::text, $2::text)",
                limit.get()
            ),
            params: vec![table.schema().to_string(), table.table().to_string()],
            shape: RowQueryShape::Rendered,
            limit,
        }),
        IdentQuoting::Client => {
            let schema = quote_ident(table.schema())?;
            let name = quote_ident(table.table())?;
            Ok(RowQuery {
                table: table.clone(),
                text: format!("SELECT * FROM {}.{} LIMIT {}", schema, name, limit.get()),
                params: Vec::new(),
                shape: RowQueryShape::Direct,
                limit,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{IdentifierResolver, DBO_SCHEMA};
    use proptest::prelude::*;

    fn order_details() -> TableIdentifier {
        IdentifierResolver::new(DBO_SCHEMA)
            .and_then(|r| r.resolve("dbo.Order Details"))
            .expect("valid identifier")
    }

    #[test]
    fn test_row_limit_bounds() {
        assert_eq!(RowLimit::new(1).map(RowLimit::get), Ok(1));
        assert_eq!(RowLimit::new(5000).map(RowLimit::get), Ok(5000));
        for bad in [0, 5001, -3, i64::MAX, i64::MIN] {
            assert!(matches!(
                RowLimit::new(bad),
                Err(BrowseError::OutOfRangeLimit { value, .. }) if value == bad
            ));
        }
        assert_eq!(RowLimit::default().get(), 100);
    }

    #[test]
    fn test_server_quoting_binds_identifiers() -> BrowseResult<()> {
        let query = build_row_query(&order_details(), RowLimit::new(25)?, IdentQuoting::Server)?;
        assert_eq!(query.shape, RowQueryShape::Rendered);
        assert_eq!(query.params, vec!["dbo".to_string(), "Order Details".to_string()]);
        assert!(query.text.contains("%I.%I"));
        assert!(query.text.contains("LIMIT 25"));
        assert!(!query.text.contains("Order Details"));
        Ok(())
    }

    #[test]
    fn test_client_quoting_wraps_identifiers() -> BrowseResult<()> {
        let query = build_row_query(&order_details(), RowLimit::new(2)?, IdentQuoting::Client)?;
        assert_eq!(query.shape, RowQueryShape::Direct);
        assert!(query.params.is_empty());
        assert_eq!(query.text, "SELECT * FROM \"dbo\".\"Order Details\" LIMIT 2");
        Ok(())
    }

    #[test]
    fn test_quote_ident_rejects_delimiters() {
        assert!(quote_ident("Orders\"; DROP TABLE x; --").is_err());
        assert!(quote_ident("a\"b").is_err());
        assert!(quote_ident("").is_err());
        assert!(quote_ident("a;b").is_err());
        assert_eq!(quote_ident("Order Details").as_deref(), Ok("\"Order Details\""));
    }

    #[test]
    fn test_quoting_from_str() {
        assert_eq!("server".parse::<IdentQuoting>(), Ok(IdentQuoting::Server));
        assert_eq!(" Client ".parse::<IdentQuoting>(), Ok(IdentQuoting::Client));
        assert!("both".parse::<IdentQuoting>().is_err());
    }

    proptest! {
        #[test]
        fn prop_row_limit_accepts_exact_range(value in -10_000i64..10_000) {
            let accepted = RowLimit::new(value).is_ok();
            prop_assert_eq!(accepted, (1..=5000).contains(&value));
        }

        /// Server-mode text never carries the identifier; client-mode text
        /// only carries it between double quotes.
        #[test]
        fn prop_identifier_never_bare_in_sql(
            schema in "[A-Za-z_][A-Za-z0-9_]{0,10}",
            table in "[A-Za-z_][A-Za-z0-9_ ]{0,10}[A-Za-z0-9_]",
            limit in 1i64..=5000,
        ) {
            let id = IdentifierResolver::new(DBO_SCHEMA)
                .and_then(|r| r.resolve(&format!("{}.{}", schema, table)))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let limit = RowLimit::new(limit).map_err(|e| TestCaseError::fail(e.to_string()))?;

            let server = build_row_query(&id, limit, IdentQuoting::Server)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&server.params, &vec![schema.clone(), table.clone()]);
            prop_assert!(server.text.starts_with("SELECT format('SELECT * FROM %I.%I LIMIT "));

            let client = build_row_query(&id, limit, IdentQuoting::Client)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let expected = format!("SELECT * FROM \"{}\".\"{}\" LIMIT {}", schema, table, limit);
            prop_assert_eq!(client.text, expected);
        }
    }
}
