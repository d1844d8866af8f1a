//! Error types for copy operations.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

/// Errors that can occur during copy operations.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Failed to create target directory.
    #[error("Failed to create directory {}: {io_error}", path.display())]
    CreateDirError {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        io_error: std::io::Error,
    },

    /// Failed to copy a file.
    #[error("Failed to copy {} to {}: {io_error}", source_path.display(), target_path.display())]
    FileCopyError {
        /// Source file path.
        source_path: PathBuf,
        /// Target file path.
        target_path: PathBuf,
        /// The underlying IO error.
        io_error: std::io::Error,
    },

    /// Failed to remove an existing destination before replacing it.
    #[error("Failed to remove {}: {io_error}", path.display())]
    RemoveError {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        io_error: std::io::Error,
    },

    /// Failed to move a staged copy into place.
    #[error("Failed to rename {} to {}: {io_error}", from.display(), to.display())]
    RenameError {
        /// Staged file path.
        from: PathBuf,
        /// Final file path.
        to: PathBuf,
        /// The underlying IO error.
        io_error: std::io::Error,
    },

    /// The copy worker thread could not be started.
    #[error("Failed to spawn copy worker: {io_error}")]
    SpawnError {
        /// The underlying IO error.
        io_error: std::io::Error,
    },

    /// A task was enqueued after the engine stopped accepting work.
    #[error("Copy engine is no longer accepting tasks ({})", destination.display())]
    EngineStopped {
        /// Destination of the rejected task.
        destination: PathBuf,
    },
}
