//! Column label resolution
//!
//! A [`ColumnLabelMap`] overrides physical column names with display labels.
//! [`LabelResolver`] builds one per request from the catalog's column
//! comments, the static [`LabelDictionary`], or both. Resolution is total: a
//! failed metadata lookup degrades to physical names and is only logged.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::dictionary::LabelDictionary;
use crate::identifier::TableIdentifier;

// ============================================================================
// COLUMN LABEL MAP
// ============================================================================

/// Physical column name to display label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnLabelMap {
    labels: BTreeMap<String, String>,
}

impl ColumnLabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label, trimming it. Blank labels are ignored and return `false`.
    pub fn insert(&mut self, column: impl Into<String>, label: impl AsRef<str>) -> bool {
        let label = label.as_ref().trim();
        if label.is_empty() {
            return false;
        }
        self.labels.insert(column.into(), label.to_string());
        true
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The label for `column`, or the column name itself.
    pub fn display_label<'a>(&'a self, column: &'a str) -> &'a str {
        self.get(column).unwrap_or(column)
    }

    /// Add entries from `other` for columns this map has no label for.
    pub fn fill_from(&mut self, other: &ColumnLabelMap) {
        for (column, label) in other.iter() {
            if !self.labels.contains_key(column) {
                self.insert(column, label);
            }
        }
    }

    /// Drop entries for columns not in `columns`.
    pub fn retain_columns(&mut self, columns: &[String]) {
        let keep: HashSet<&str> = columns.iter().map(String::as_str).collect();
        self.labels.retain(|column, _| keep.contains(column.as_str()));
    }

    /// Map physical column names to display labels.
    ///
    /// The result has the same length and order as `physical`. Labels are
    /// unique: a label already taken by an earlier column becomes
    /// `label (physical)`, then `label (physical) #n`.
    pub fn apply(&self, physical: &[String]) -> Vec<String> {
        let mut taken: HashSet<String> = HashSet::with_capacity(physical.len());
        physical
            .iter()
            .map(|column| {
                let label = self.display_label(column);
                let mut candidate = label.to_string();
                if taken.contains(&candidate) {
                    candidate = format!("{} ({})", label, column);
                    let mut n = 2;
                    while taken.contains(&candidate) {
                        candidate = format!("{} ({}) #{}", label, column, n);
                        n += 1;
                    }
                }
                taken.insert(candidate.clone());
                candidate
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ColumnLabelMap
where
    K: Into<String>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (column, label) in iter {
            map.insert(column, label);
        }
        map
    }
}

// ============================================================================
// STRATEGY
// ============================================================================

/// Which label sources are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStrategy {
    /// Column comments from the catalog only.
    Metadata,
    /// The static dictionary only.
    Static,
    /// Column comments first, the dictionary for whatever they leave unlabelled.
    #[default]
    Layered,
}

impl LabelStrategy {
    fn uses_metadata(self) -> bool {
        matches!(self, Self::Metadata | Self::Layered)
    }

    fn uses_dictionary(self) -> bool {
        matches!(self, Self::Static | Self::Layered)
    }
}

impl FromStr for LabelStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metadata" => Ok(Self::Metadata),
            "static" => Ok(Self::Static),
            "layered" => Ok(Self::Layered),
            other => Err(format!(
                "unknown label strategy '{}', expected 'metadata', 'static' or 'layered'",
                other
            )),
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Builds a [`ColumnLabelMap`] for one table request.
#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    strategy: LabelStrategy,
    dictionary: Arc<LabelDictionary>,
}

impl LabelResolver {
    pub fn new(strategy: LabelStrategy, dictionary: Arc<LabelDictionary>) -> Self {
        Self {
            strategy,
            dictionary,
        }
    }

    /// Resolve labels for `physical` columns of `table`. Never fails.
    pub async fn resolve(
        &self,
        catalog: &dyn Catalog,
        table: &TableIdentifier,
        physical: &[String],
    ) -> ColumnLabelMap {
        let mut labels = if self.strategy.uses_metadata() {
            metadata_labels(catalog, table).await
        } else {
            ColumnLabelMap::new()
        };

        if self.strategy.uses_dictionary() {
            if let Some(entries) = self.dictionary.for_table(table) {
                labels.fill_from(entries);
            }
        }

        labels.retain_columns(physical);
        labels
    }
}

/// Column comments for `table`, or an empty map when the lookup fails.
async fn metadata_labels(catalog: &dyn Catalog, table: &TableIdentifier) -> ColumnLabelMap {
    match catalog.column_comments(table).await {
        Ok(labels) => labels,
        Err(err) => {
            tracing::warn!(
                table = %table,
                error = %err,
                "Column comment lookup failed, using physical column names"
            );
            ColumnLabelMap::new()
        }
    }
}
