//! TableScope Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - An in-memory [`Catalog`] with call counting and failure switches
//! - Proptest generators for identifiers, columns and label maps
//! - Northwind fixtures

pub use tablescope_core::{
    BrowseError, BrowseResult, Catalog, CellValue, ColumnLabelMap, IdentQuoting,
    IdentifierResolver, LabelDictionary, LabelResolver, LabelStrategy, RawRows, RowQuery,
    TableBrowser, TableIdentifier, TableName, TablePage,
};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

// ============================================================================
// IN-MEMORY CATALOG
// ============================================================================

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    rows: RawRows,
    comments: ColumnLabelMap,
}

/// Catalog backed by a map of tables.
///
/// Row queries are answered from `RowQuery::table` and honour
/// `RowQuery::limit`; unknown tables fail with `QueryFailed` the way a
/// missing relation does in PostgreSQL.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: BTreeMap<TableName, MemoryTable>,
    fail_comments: AtomicBool,
    fail_queries: AtomicBool,
    calls: AtomicUsize,
    queries: Mutex<Vec<RowQuery>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its columns and rows.
    pub fn with_table(
        mut self,
        schema: &str,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        let mut raw = RawRows::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            raw.push(row);
        }
        self.tables.entry(TableName::new(schema, table)).or_default().rows = raw;
        self
    }

    /// Attach a column comment to an existing or future table.
    pub fn with_comment(mut self, schema: &str, table: &str, column: &str, comment: &str) -> Self {
        self.tables
            .entry(TableName::new(schema, table))
            .or_default()
            .comments
            .insert(column, comment);
        self
    }

    /// Make every `column_comments` call fail.
    pub fn fail_comments(&self, fail: bool) {
        self.fail_comments.store(fail, Ordering::SeqCst);
    }

    /// Make every `fetch_rows`, `list_tables` and `ping` call fail.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Total number of catalog calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Row queries received so far, oldest first.
    pub fn queries(&self) -> Vec<RowQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn record_call(&self) -> BrowseResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(BrowseError::query_failed("connection refused"));
        }
        Ok(())
    }

    fn lookup(&self, table: &TableIdentifier) -> Option<&MemoryTable> {
        self.tables.get(&TableName::new(table.schema(), table.table()))
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_tables(&self) -> BrowseResult<Vec<TableName>> {
        self.record_call()?;
        Ok(self.tables.keys().cloned().collect())
    }

    async fn fetch_rows(&self, query: &RowQuery) -> BrowseResult<RawRows> {
        self.record_call()?;
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        let table = self.lookup(&query.table).ok_or_else(|| {
            BrowseError::query_failed(format!(
                "relation \"{}\" does not exist",
                query.table.qualified()
            ))
        })?;

        let limit = query.limit.get() as usize;
        Ok(RawRows {
            columns: table.rows.columns.clone(),
            rows: table.rows.rows.iter().take(limit).cloned().collect(),
        })
    }

    async fn column_comments(&self, table: &TableIdentifier) -> BrowseResult<ColumnLabelMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_comments.load(Ordering::SeqCst) {
            return Err(BrowseError::metadata_lookup_failed(
                "permission denied for table pg_description",
            ));
        }
        Ok(self
            .lookup(table)
            .map(|t| t.comments.clone())
            .unwrap_or_default())
    }

    async fn ping(&self) -> BrowseResult<()> {
        self.record_call()
    }
}

/// Build a browser over `catalog` with the `dbo` default schema.
pub fn browser_over(
    catalog: Arc<InMemoryCatalog>,
    strategy: LabelStrategy,
    dictionary: LabelDictionary,
    quoting: IdentQuoting,
) -> BrowseResult<TableBrowser> {
    Ok(TableBrowser::new(
        catalog,
        IdentifierResolver::new(tablescope_core::DBO_SCHEMA)?,
        LabelResolver::new(strategy, Arc::new(dictionary)),
        quoting,
    ))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for TableScope types.

    use super::*;
    use proptest::prelude::*;

    /// A single allow-listed identifier part without dots or edge whitespace.
    pub fn arb_safe_part() -> impl Strategy<Value = String> {
        "[A-Za-z_][A-Za-z0-9_ -]{0,14}[A-Za-z0-9_]"
    }

    /// `schema.table` built from safe parts.
    pub fn arb_qualified_identifier() -> impl Strategy<Value = (String, String)> {
        (arb_safe_part(), arb_safe_part())
    }

    /// Strings containing at least one character outside the allow-list.
    pub fn arb_hostile_identifier() -> impl Strategy<Value = String> {
        (
            "[A-Za-z0-9_]{0,8}",
            prop::sample::select(vec![
                ";", "'", "\"", "[", "]", "(", ")", "/*", "=", "\\", "`", "*", "<",
            ]),
            "[A-Za-z0-9_ ]{0,8}",
        )
            .prop_map(|(prefix, bad, suffix)| format!("{}{}{}", prefix, bad, suffix))
    }

    /// Distinct physical column names.
    pub fn arb_columns() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[A-Za-z][A-Za-z0-9_]{0,12}", 1..10)
            .prop_map(|set| set.into_iter().collect())
    }

    /// A label map over a subset of `columns`.
    pub fn arb_label_map(columns: Vec<String>) -> impl Strategy<Value = ColumnLabelMap> {
        let len = columns.len();
        prop::collection::vec(
            prop::option::of("[\\p{Han}A-Za-z ]{1,8}"),
            len,
        )
        .prop_map(move |labels| {
            columns
                .iter()
                .zip(labels)
                .filter_map(|(column, label)| label.map(|l| (column.clone(), l)))
                .collect()
        })
    }

    pub fn arb_label_strategy() -> impl Strategy<Value = LabelStrategy> {
        prop_oneof![
            Just(LabelStrategy::Metadata),
            Just(LabelStrategy::Static),
            Just(LabelStrategy::Layered),
        ]
    }

    pub fn arb_cell() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Null),
            any::<bool>().prop_map(CellValue::Bool),
            any::<i64>().prop_map(CellValue::Int),
            (-1.0e9f64..1.0e9).prop_map(CellValue::Float),
            "\\PC{0,16}".prop_map(CellValue::Text),
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Northwind-shaped fixtures.

    use super::*;

    pub const ORDERS_COLUMNS: [&str; 5] =
        ["OrderID", "CustomerID", "EmployeeID", "Freight", "ShipCity"];

    pub fn order_row(order_id: i64, customer: &str, freight: f64, city: &str) -> Vec<CellValue> {
        vec![
            CellValue::from(order_id),
            CellValue::from(customer),
            CellValue::from(5i64),
            CellValue::from(freight),
            CellValue::from(city),
        ]
    }

    /// `dbo.Orders`, `dbo.Order Details`, `dbo.Customers` and an empty
    /// `dbo.Shippers`, with a comment on `Orders.OrderID` only.
    pub fn northwind_catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_table(
                "dbo",
                "Orders",
                &ORDERS_COLUMNS,
                vec![
                    order_row(10248, "VINET", 32.38, "Reims"),
                    order_row(10249, "TOMSP", 11.61, "Münster"),
                    order_row(10250, "HANAR", 65.83, "Rio de Janeiro"),
                ],
            )
            .with_comment("dbo", "Orders", "OrderID", "訂單編號")
            .with_table(
                "dbo",
                "Order Details",
                &["OrderID", "ProductID", "UnitPrice", "Quantity", "Discount"],
                vec![vec![
                    CellValue::from(10248i64),
                    CellValue::from(11i64),
                    CellValue::from(14.0),
                    CellValue::from(12i64),
                    CellValue::from(0.0),
                ]],
            )
            .with_table(
                "dbo",
                "Customers",
                &["CustomerID", "CompanyName", "Phone"],
                vec![vec![
                    CellValue::from("ALFKI"),
                    CellValue::from("Alfreds Futterkiste"),
                    CellValue::from("030-0074321"),
                ]],
            )
            .with_table("dbo", "Shippers", &["ShipperID", "CompanyName", "Phone"], Vec::new())
    }

    /// A slice of the Northwind label dictionary.
    pub fn northwind_dictionary() -> LabelDictionary {
        let mut dictionary = LabelDictionary::new();
        dictionary.insert_table(
            "Orders",
            [
                ("OrderID", "訂單編號"),
                ("CustomerID", "客戶代碼"),
                ("Freight", "運費"),
                ("ShipCity", "收貨城市"),
            ]
            .into_iter()
            .collect(),
        );
        dictionary.insert_table(
            "Order Details",
            [("Quantity", "數量"), ("Discount", "折扣")].into_iter().collect(),
        );
        dictionary.insert_table(
            "Shippers",
            [("Phone", "電話")].into_iter().collect(),
        );
        dictionary
    }
}
