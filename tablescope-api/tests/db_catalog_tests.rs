//! PostgreSQL catalog tests.
//!
//! Require a reachable database configured through `TABLESCOPE_DB_*`.
//! Run with `cargo test -p tablescope-api --features db-tests`.

#![cfg(feature = "db-tests")]

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::db::{test_db_client, test_db_client_with_pool};
use tablescope_api::DbClient;
use tablescope_core::{
    build_row_query, BrowseError, Catalog, CellValue, IdentQuoting, IdentifierResolver,
    LabelDictionary, LabelResolver, LabelStrategy, RowLimit, RowQuery, RowQueryShape,
    TableBrowser, TableIdentifier,
};

/// A throwaway schema holding an `Order Details` table with one commented
/// column. Dropped by [`Scratch::drop_schema`].
struct Scratch {
    db: DbClient,
    schema: String,
}

impl Scratch {
    async fn create() -> Result<Self, String> {
        let db = test_db_client().map_err(|e| e.to_string())?;
        let schema = format!("tablescope_test_{}", uuid::Uuid::new_v4().simple());
        let conn = db.get_conn().await.map_err(|e| e.to_string())?;
        conn.batch_execute(&format!(
            r#"
            CREATE SCHEMA "{schema}";
            CREATE TABLE "{schema}"."Order Details" (
                "OrderID" integer NOT NULL,
                "Quantity" smallint NOT NULL,
                "Note" text
            );
            COMMENT ON COLUMN "{schema}"."Order Details"."Quantity" IS '數量';
            INSERT INTO "{schema}"."Order Details" VALUES
                (10248, 12, 'first'),
                (10249, 9, NULL),
                (10250, 40, 'third');
            "#
        ))
        .await
        .map_err(|e| e.to_string())?;
        Ok(Self { db, schema })
    }

    fn resolver(&self) -> Result<IdentifierResolver, String> {
        IdentifierResolver::new(self.schema.as_str()).map_err(|e| e.to_string())
    }

    fn identifier(&self, table: &str) -> Result<TableIdentifier, String> {
        self.resolver()?.resolve(table).map_err(|e| e.to_string())
    }

    fn table(&self) -> Result<TableIdentifier, String> {
        self.identifier("Order Details")
    }

    fn browser(&self, quoting: IdentQuoting) -> Result<TableBrowser, String> {
        Ok(TableBrowser::new(
            Arc::new(self.db.clone()),
            self.resolver()?,
            LabelResolver::new(LabelStrategy::Layered, Arc::new(LabelDictionary::new())),
            quoting,
        ))
    }

    async fn drop_schema(self) -> Result<(), String> {
        let conn = self.db.get_conn().await.map_err(|e| e.to_string())?;
        conn.batch_execute(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .await
            .map_err(|e| e.to_string())
    }
}

#[tokio::test]
async fn test_ping() -> Result<(), String> {
    let db = test_db_client().map_err(|e| e.to_string())?;
    db.ping().await.map_err(|e| e.to_string())
}

#[tokio::test]
async fn test_list_tables_includes_scratch_table() -> Result<(), String> {
    let scratch = Scratch::create().await?;

    let tables = scratch.db.list_tables().await.map_err(|e| e.to_string())?;
    assert!(tables
        .iter()
        .any(|t| t.schema == scratch.schema && t.table == "Order Details"));
    assert!(tables.windows(2).all(|w| w[0] <= w[1]));

    scratch.drop_schema().await
}

#[tokio::test]
async fn test_fetch_rows_both_quoting_modes() -> Result<(), String> {
    let scratch = Scratch::create().await?;
    let limit = RowLimit::new(2).map_err(|e| e.to_string())?;

    for quoting in [IdentQuoting::Server, IdentQuoting::Client] {
        let query = build_row_query(&scratch.table()?, limit, quoting).map_err(|e| e.to_string())?;
        let raw = scratch.db.fetch_rows(&query).await.map_err(|e| e.to_string())?;

        assert_eq!(raw.columns, vec!["OrderID", "Quantity", "Note"], "{:?}", quoting);
        assert_eq!(raw.rows.len(), 2, "{:?}", quoting);
        assert!(raw.rows.iter().all(|row| row.len() == 3));
    }

    scratch.drop_schema().await
}

#[tokio::test]
async fn test_column_comments_are_read() -> Result<(), String> {
    let scratch = Scratch::create().await?;

    let comments = scratch
        .db
        .column_comments(&scratch.table()?)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(comments.get("Quantity"), Some("數量"));
    assert_eq!(comments.get("OrderID"), None);

    scratch.drop_schema().await
}

#[tokio::test]
async fn test_browser_reads_labeled_page() -> Result<(), String> {
    let scratch = Scratch::create().await?;
    let browser = scratch.browser(IdentQuoting::Server)?;

    let page = browser
        .read_table(&format!("{}.Order%20Details", scratch.schema), Some(5))
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(page.columns, vec!["OrderID", "數量", "Note"]);
    assert_eq!(page.row_count(), 3);
    assert!(page.rows.iter().any(|row| row[2] == CellValue::Null));

    scratch.drop_schema().await
}

#[tokio::test]
async fn test_missing_relation_is_query_failed() -> Result<(), String> {
    let scratch = Scratch::create().await?;
    let missing = scratch.identifier("NoSuchTable")?;
    let limit = RowLimit::new(1).map_err(|e| e.to_string())?;

    for quoting in [IdentQuoting::Server, IdentQuoting::Client] {
        let query = build_row_query(&missing, limit, quoting).map_err(|e| e.to_string())?;
        let err = scratch
            .db
            .fetch_rows(&query)
            .await
            .expect_err("relation does not exist");
        assert!(matches!(err, BrowseError::QueryFailed { .. }), "{:?}", err);
    }

    scratch.drop_schema().await
}

#[tokio::test]
async fn test_abandoned_fetch_does_not_poison_pool() -> Result<(), String> {
    let db = test_db_client_with_pool(1).map_err(|e| e.to_string())?;
    let sleeper = RowQuery {
        table: IdentifierResolver::default()
            .resolve("sleeper")
            .map_err(|e| e.to_string())?,
        text: "SELECT pg_sleep(30)".to_string(),
        params: Vec::new(),
        shape: RowQueryShape::Direct,
        limit: RowLimit::default(),
    };

    let abandoned = tokio::time::timeout(Duration::from_millis(300), db.fetch_rows(&sleeper)).await;
    assert!(abandoned.is_err(), "pg_sleep(30) finished early");

    // The only pool slot must come back as a fresh connection, and nothing
    // queued against the old backend may cancel the statements that follow.
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(10), db.ping())
            .await
            .map_err(|_| "ping queued behind the abandoned statement".to_string())?
            .map_err(|e| e.to_string())?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}
