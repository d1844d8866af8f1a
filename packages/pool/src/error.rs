//! Error types for the task pool.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error;

/// Errors that can occur while starting a task pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A pool needs at least one worker.
    #[error("A task pool needs at least one worker thread")]
    NoWorkers,

    /// The OS refused to start a worker thread.
    #[error("Failed to spawn worker thread: {source}")]
    SpawnError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
