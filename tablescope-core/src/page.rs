//! Fetched rows, before and after relabelling

use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::cell::CellValue;
use crate::identifier::TableIdentifier;
use crate::labels::ColumnLabelMap;

/// Rows as returned by the catalog, keyed by physical column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawRows {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }
}

/// A relabelled table page.
///
/// Serializes as `{"table", "columns", "rows"}` where each row is an object
/// keyed by display label in column order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TablePage {
    /// `schema.table`
    pub table: String,
    /// Display labels in column-declaration order.
    pub columns: Vec<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub rows: Vec<Vec<CellValue>>,
}

impl TablePage {
    /// Replace physical column names with display labels.
    pub fn relabel(table: &TableIdentifier, raw: RawRows, labels: &ColumnLabelMap) -> Self {
        Self {
            table: table.qualified(),
            columns: labels.apply(&raw.columns),
            rows: raw.rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `row` under display label `column`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }
}

impl Serialize for TablePage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut page = serializer.serialize_struct("TablePage", 3)?;
        page.serialize_field("table", &self.table)?;
        page.serialize_field("columns", &self.columns)?;
        page.serialize_field(
            "rows",
            &LabeledRows {
                columns: &self.columns,
                rows: &self.rows,
            },
        )?;
        page.end()
    }
}

struct LabeledRows<'a> {
    columns: &'a [String],
    rows: &'a [Vec<CellValue>],
}

impl Serialize for LabeledRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for cells in self.rows {
            seq.serialize_element(&LabeledRow {
                columns: self.columns,
                cells,
            })?;
        }
        seq.end()
    }
}

struct LabeledRow<'a> {
    columns: &'a [String],
    cells: &'a [CellValue],
}

impl Serialize for LabeledRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells.iter()) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}
