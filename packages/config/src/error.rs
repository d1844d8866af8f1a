//! Error types for configuration loading.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file {}: {source}", path.display())]
    ReadError {
        /// Path to the file that couldn't be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config {}: {source}", path.display())]
    TomlParseError {
        /// Path to the file that couldn't be parsed.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// An ignore pattern is not a valid glob.
    #[error("Invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: globset::Error,
    },

    /// Failed to create a store directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirError {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Explicitly requested config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
}
