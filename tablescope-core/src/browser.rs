//! Request-scoped orchestration
//!
//! [`TableBrowser::read_table`] validates the limit and the identifier before
//! any catalog call, fetches rows, then relabels columns. Label resolution
//! cannot fail, so the only errors after validation are `QueryFailed`.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::error::BrowseResult;
use crate::identifier::{IdentifierResolver, TableName};
use crate::labels::LabelResolver;
use crate::page::TablePage;
use crate::query::{build_row_query, IdentQuoting, RowLimit};

/// Lists tables and reads relabelled pages through a [`Catalog`].
#[derive(Clone)]
pub struct TableBrowser {
    catalog: Arc<dyn Catalog>,
    resolver: IdentifierResolver,
    labels: LabelResolver,
    quoting: IdentQuoting,
}

impl TableBrowser {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        resolver: IdentifierResolver,
        labels: LabelResolver,
        quoting: IdentQuoting,
    ) -> Self {
        Self {
            catalog,
            resolver,
            labels,
            quoting,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// All user tables, ordered by schema then table.
    pub async fn list_tables(&self) -> BrowseResult<Vec<TableName>> {
        let mut tables = self.catalog.list_tables().await?;
        tables.sort();
        Ok(tables)
    }

    /// Read up to `limit` rows (default [`RowLimit::DEFAULT`]) from the table
    /// named by `raw`.
    #[instrument(skip(self), fields(quoting = ?self.quoting))]
    pub async fn read_table(&self, raw: &str, limit: Option<i64>) -> BrowseResult<TablePage> {
        let limit = limit.map(RowLimit::new).transpose()?.unwrap_or_default();
        let table = self.resolver.resolve(raw)?;
        let query = build_row_query(&table, limit, self.quoting)?;

        let raw_rows = self.catalog.fetch_rows(&query).await?;
        let labels = self
            .labels
            .resolve(self.catalog.as_ref(), &table, &raw_rows.columns)
            .await;

        debug!(
            table = %table,
            rows = raw_rows.rows.len(),
            columns = raw_rows.columns.len(),
            relabelled = labels.len(),
            "Read table page"
        );

        Ok(TablePage::relabel(&table, raw_rows, &labels))
    }
}

impl std::fmt::Debug for TableBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableBrowser")
            .field("resolver", &self.resolver)
            .field("labels", &self.labels)
            .field("quoting", &self.quoting)
            .finish_non_exhaustive()
    }
}
