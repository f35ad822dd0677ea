//! TableScope Core
//!
//! Everything between a raw `schema.table` string and a relabelled page of
//! rows, with the database behind the [`Catalog`] trait. Nothing here knows
//! about PostgreSQL or HTTP.

pub mod browser;
pub mod catalog;
pub mod cell;
pub mod dictionary;
pub mod error;
pub mod identifier;
pub mod labels;
pub mod page;
pub mod query;

pub use browser::TableBrowser;
pub use catalog::Catalog;
pub use cell::{CellValue, Decimal};
pub use dictionary::LabelDictionary;
pub use error::{BrowseError, BrowseResult, DictionaryError};
pub use identifier::{
    is_allowed, IdentifierResolver, TableIdentifier, TableName, DBO_SCHEMA,
    IDENTIFIER_ALLOW_LIST, PUBLIC_SCHEMA,
};
pub use labels::{ColumnLabelMap, LabelResolver, LabelStrategy};
pub use page::{RawRows, TablePage};
pub use query::{build_row_query, quote_ident, IdentQuoting, RowLimit, RowQuery, RowQueryShape};
