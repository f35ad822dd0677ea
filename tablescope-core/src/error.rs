//! Error types for table browsing operations

use thiserror::Error;

/// Errors raised while resolving, querying or labelling a table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowseError {
    #[error("Invalid table identifier: {reason}")]
    InvalidIdentifier { reason: String },

    #[error("Row limit {value} is out of range, expected {min}..={max}")]
    OutOfRangeLimit { value: i64, min: i64, max: i64 },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    /// Never reaches an HTTP caller; label resolution collapses it to an empty map.
    #[error("Column metadata lookup failed: {message}")]
    MetadataLookupFailed { message: String },
}

impl BrowseError {
    pub fn invalid_identifier(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            reason: reason.into(),
        }
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    pub fn metadata_lookup_failed(message: impl Into<String>) -> Self {
        Self::MetadataLookupFailed {
            message: message.into(),
        }
    }

    /// Whether the error was detected before touching the database.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier { .. } | Self::OutOfRangeLimit { .. }
        )
    }
}

/// Errors raised while loading a static label dictionary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("Failed to read label dictionary {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse label dictionary as {format}: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("Unsupported label dictionary extension: {extension}")]
    UnsupportedFormat { extension: String },
}

/// Result type alias for browse operations.
pub type BrowseResult<T> = Result<T, BrowseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = BrowseError::OutOfRangeLimit {
            value: 5001,
            min: 1,
            max: 5000,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("5001"));
        assert!(msg.contains("1..=5000"));
    }

    #[test]
    fn test_query_failed_keeps_engine_message() {
        let err = BrowseError::query_failed("relation \"dbo.NoSuchTable\" does not exist");
        assert!(format!("{}", err).contains("does not exist"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(BrowseError::invalid_identifier("bad").is_client_error());
        assert!(BrowseError::OutOfRangeLimit {
            value: 0,
            min: 1,
            max: 5000
        }
        .is_client_error());
        assert!(!BrowseError::metadata_lookup_failed("timeout").is_client_error());
    }

    #[test]
    fn test_dictionary_error_display() {
        let err = DictionaryError::UnsupportedFormat {
            extension: "yaml".to_string(),
        };
        assert!(format!("{}", err).contains("yaml"));
    }
}
