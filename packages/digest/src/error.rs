//! Error types for hashing and the digest cache.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use thiserror::Error;

use crate::digest::Digest;

/// Errors that can occur while hashing files or moving the cache to and from
/// disk.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The file to hash could not be opened.
    #[error("Failed to open {} for hashing: {source}", path.display())]
    OpenError {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the file failed part way through.
    #[error("Failed to read {} while hashing: {source}", path.display())]
    ReadError {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A cached digest disagrees with a freshly computed one.
    #[error("Cached digest {cached} for {} does not match computed digest {computed}", path.display())]
    CacheMismatch {
        /// The file path.
        path: PathBuf,
        /// Digest found in the cache.
        cached: Digest,
        /// Digest computed from the file content.
        computed: Digest,
    },

    /// The cache file exists but could not be read.
    #[error("Failed to load digest cache {}: {source}", path.display())]
    CacheLoadError {
        /// The cache file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file could not be written.
    #[error("Failed to persist digest cache {}: {source}", path.display())]
    CachePersistError {
        /// The cache file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DigestError {
    /// Whether this error signals cache corruption rather than an I/O problem
    /// with a single file.
    #[must_use]
    pub const fn is_inconsistency(&self) -> bool {
        matches!(self, Self::CacheMismatch { .. })
    }
}
