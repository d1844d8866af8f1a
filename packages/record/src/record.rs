//! The per-file record captured at discovery time.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// One discovered file.
///
/// `digest` stays empty until hashing succeeds. An empty digest means no valid
/// backup copy exists for this file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the original file.
    pub path: PathBuf,
    /// Last modification time in whole seconds since the Unix epoch.
    pub modified: i64,
    /// Size in bytes.
    pub size: u64,
    /// Uppercase hex content digest, or empty.
    #[serde(rename = "md5")]
    pub digest: String,
}

impl FileRecord {
    /// Build a record for `path`, reading its metadata eagerly.
    ///
    /// # Errors
    ///
    /// * If the file's metadata cannot be read
    pub fn from_path(path: &Path) -> Result<Self, RecordError> {
        let metadata = fs::metadata(path).map_err(|e| RecordError::MetadataError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            modified: modified_secs(&metadata),
            size: metadata.len(),
            digest: String::new(),
        })
    }

    /// Whether a digest has been assigned.
    #[must_use]
    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }
}

/// Modification time of `metadata` in whole seconds since the Unix epoch.
///
/// Times before the epoch come out negative. Platforms without modification
/// times yield 0.
#[must_use]
pub fn modified_secs(metadata: &fs::Metadata) -> i64 {
    let Ok(modified) = metadata.modified() else {
        return 0;
    };

    match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}
