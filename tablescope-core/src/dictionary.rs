//! Static label dictionary
//!
//! Loaded once at startup from TOML or JSON and shared read-only. Keys are
//! table names, either qualified (`dbo.Orders`) or bare (`Orders`); values map
//! physical column names to labels.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DictionaryError;
use crate::identifier::TableIdentifier;
use crate::labels::ColumnLabelMap;

/// Process-wide table -> column -> label mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDictionary {
    tables: BTreeMap<String, ColumnLabelMap>,
}

impl LabelDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register labels for `table`, merging into any existing entry.
    pub fn insert_table(&mut self, table: impl Into<String>, labels: ColumnLabelMap) {
        self.tables.entry(table.into()).or_default().fill_from(&labels);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Labels for `table`: the qualified key wins over the bare table name.
    pub fn for_table(&self, table: &TableIdentifier) -> Option<&ColumnLabelMap> {
        self.tables
            .get(&table.qualified())
            .or_else(|| self.tables.get(table.table()))
    }

    pub fn from_toml_str(input: &str) -> Result<Self, DictionaryError> {
        let raw: BTreeMap<String, BTreeMap<String, String>> =
            toml::from_str(input).map_err(|e| DictionaryError::Parse {
                format: "TOML",
                reason: e.to_string(),
            })?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_json_str(input: &str) -> Result<Self, DictionaryError> {
        let raw: BTreeMap<String, BTreeMap<String, String>> =
            serde_json::from_str(input).map_err(|e| DictionaryError::Parse {
                format: "JSON",
                reason: e.to_string(),
            })?;
        Ok(Self::from_raw(raw))
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let parse: fn(&str) -> Result<Self, DictionaryError> = match extension.as_str() {
            "toml" => Self::from_toml_str,
            "json" => Self::from_json_str,
            _ => return Err(DictionaryError::UnsupportedFormat { extension }),
        };

        let contents = std::fs::read_to_string(path).map_err(|e| DictionaryError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let dictionary = parse(&contents)?;

        tracing::info!(
            path = %path.display(),
            tables = dictionary.len(),
            "Loaded label dictionary"
        );
        Ok(dictionary)
    }

    /// Routes every label through [`ColumnLabelMap::insert`] so blank labels drop out.
    fn from_raw(raw: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut dictionary = Self::new();
        for (table, columns) in raw {
            dictionary.insert_table(table, columns.into_iter().collect());
        }
        dictionary
    }
}
