//! Error types for loading catalog record files.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that prevent a record file from being used at all.
///
/// Individual malformed records are not errors; they are logged and skipped
/// by [`parse_records`](super::parse_records).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The record file could not be read.
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        /// Path of the record file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The record file could not be written.
    #[error("failed to write catalog file {path}: {source}")]
    Write {
        /// Path of the record file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("catalog file is not valid JSON: {source}")]
    Json {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The document is JSON but its top level is not an array.
    #[error("catalog file must contain a JSON array of records, found {found}")]
    NotAnArray {
        /// Kind of JSON value that was found instead.
        found: &'static str,
    },
}
