//! Error types for backup and restore runs.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a backup or restore run.
///
/// Per-file problems never surface here; they are logged where they happen.
#[derive(Debug, Error)]
pub enum OperationError {
    /// IO error on a path the run cannot do without.
    #[error("IO error at {}: {source}", path.display())]
    IoError {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No usable source directory was given.
    #[error("No source path specified")]
    NoSources,

    /// Verification found cached digests that disagree with file content.
    #[error("{count} cached digest(s) disagree with file content; the digest cache is inconsistent")]
    CacheInconsistent {
        /// Number of mismatching files.
        count: usize,
    },

    /// The data directory holds no backup runs to choose from.
    #[error("No backups found in {}", data_dir.display())]
    NoBackups {
        /// The searched data directory.
        data_dir: PathBuf,
    },

    /// The backup log names no source roots.
    #[error("No backed up paths found in {}", log.display())]
    NoBackupRoots {
        /// The parsed log file.
        log: PathBuf,
    },

    /// Settings or layout error.
    #[error("Config error: {0}")]
    ConfigError(#[from] hashvault_config::ConfigError),

    /// Metadata document error.
    #[error("Metadata error: {0}")]
    RecordError(#[from] hashvault_record::RecordError),

    /// Hashing or digest cache error.
    #[error("Digest error: {0}")]
    DigestError(#[from] hashvault_digest::DigestError),

    /// Worker pool error.
    #[error("Pool error: {0}")]
    PoolError(#[from] hashvault_pool::PoolError),

    /// Copy engine error.
    #[error("Copy error: {0}")]
    CopyError(#[from] hashvault_copy::CopyError),
}
