//! Reading and writing the per-run metadata documents.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RecordError;
use crate::record::FileRecord;

/// Write the file record list to `path`.
///
/// # Errors
///
/// * If the file cannot be created or written
pub fn write_records(path: &Path, records: &[FileRecord], pretty: bool) -> Result<(), RecordError> {
    log::debug!("Writing {} file records to {}", records.len(), path.display());
    write_json(path, records, pretty)
}

/// Read a file record list written by [`write_records`].
///
/// # Errors
///
/// * If the file cannot be opened
/// * If the content is not a valid record list
pub fn read_records(path: &Path) -> Result<Vec<FileRecord>, RecordError> {
    log::debug!("Reading file records from {}", path.display());
    read_json(path)
}

/// Write the directory list to `path`.
///
/// # Errors
///
/// * If the file cannot be created or written
pub fn write_directories(
    path: &Path,
    directories: &[PathBuf],
    pretty: bool,
) -> Result<(), RecordError> {
    log::debug!(
        "Writing {} directories to {}",
        directories.len(),
        path.display()
    );
    write_json(path, directories, pretty)
}

/// Read a directory list written by [`write_directories`].
///
/// # Errors
///
/// * If the file cannot be opened
/// * If the content is not a list of paths
pub fn read_directories(path: &Path) -> Result<Vec<PathBuf>, RecordError> {
    log::debug!("Reading directories from {}", path.display());
    read_json(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<(), RecordError> {
    let file = File::create(path).map_err(|e| RecordError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let result = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    result.map_err(|e| RecordError::JsonError {
        path: path.to_path_buf(),
        source: e,
    })?;

    writer.flush().map_err(|e| RecordError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, RecordError> {
    let file = File::open(path).map_err(|e| RecordError::OpenError {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| RecordError::JsonError {
        path: path.to_path_buf(),
        source: e,
    })
}
