//! Error types for record and metadata handling.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building records or moving metadata to and
/// from disk.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Failed to read file metadata.
    #[error("Failed to get metadata for {}: {source}", path.display())]
    MetadataError {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to open a metadata document.
    #[error("Failed to open {}: {source}", path.display())]
    OpenError {
        /// The document path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write a metadata document.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// The document path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A metadata document is not valid JSON for its type.
    #[error("Failed to parse JSON in {}: {source}", path.display())]
    JsonError {
        /// The document path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
