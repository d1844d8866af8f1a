//! Plain-text log file written alongside each run.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::OperationError;

/// Message prefix marking a backed-up source root.
pub const ROOT_MARKER: &str = "Folder path: ";

/// Append-only `[LEVEL] message` log.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// Open `path` for appending, creating it and its parent if needed.
    ///
    /// # Errors
    ///
    /// * If the parent directory cannot be created or the file cannot be opened
    pub fn open(path: &Path) -> Result<Self, OperationError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OperationError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| OperationError::IoError {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Append one line.
    ///
    /// # Errors
    ///
    /// * If the write fails
    pub fn write_line(&self, level: log::Level, message: &str) -> std::io::Result<()> {
        let mut file = self.file.lock();
        writeln!(file, "[{level}] {message}")
    }

    /// Flush buffered data to disk.
    ///
    /// # Errors
    ///
    /// * If the flush fails
    pub fn flush(&self) -> std::io::Result<()> {
        self.file.lock().flush()
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Extract the root from a `[INFO] Folder path: <root>` line.
#[must_use]
pub fn parse_root_line(line: &str) -> Option<PathBuf> {
    let rest = line.strip_prefix("[INFO] ")?.strip_prefix(ROOT_MARKER)?;
    let rest = rest.trim_end_matches(['\r', '\n']);
    (!rest.is_empty()).then(|| PathBuf::from(rest))
}
