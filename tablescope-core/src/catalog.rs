//! Database boundary

use async_trait::async_trait;

use crate::error::BrowseResult;
use crate::identifier::{TableIdentifier, TableName};
use crate::labels::ColumnLabelMap;
use crate::page::RawRows;
use crate::query::RowQuery;

/// Everything the browser needs from a database.
///
/// Implementations map every driver or pool failure to
/// [`BrowseError::QueryFailed`](crate::BrowseError::QueryFailed), except
/// [`Catalog::column_comments`] which reports
/// [`BrowseError::MetadataLookupFailed`](crate::BrowseError::MetadataLookupFailed).
#[async_trait]
pub trait Catalog: Send + Sync {
    /// User tables ordered by schema, then table.
    async fn list_tables(&self) -> BrowseResult<Vec<TableName>>;

    /// Run a built row query. Columns come back in declaration order, even
    /// when there are no rows.
    async fn fetch_rows(&self, query: &RowQuery) -> BrowseResult<RawRows>;

    /// Non-blank column comments for `table`, keyed by physical column name.
    async fn column_comments(&self, table: &TableIdentifier) -> BrowseResult<ColumnLabelMap>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> BrowseResult<()>;
}
