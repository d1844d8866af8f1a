//! Configuration types for hashvault.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Version tag baked into the default data and cache directory names.
pub const STORE_FORMAT_VERSION: &str = "1";

/// Name of the JSON file listing every file record of a run.
pub const FILE_INFO_NAME: &str = "file_info.json";

/// Name of the JSON file listing every directory of a run.
pub const DIRECTORIES_NAME: &str = "directories.json";

/// Name of the per-run log file.
pub const RUN_LOG_NAME: &str = "log.txt";

/// Name of the binary digest cache file inside the cache directory.
pub const DIGEST_CACHE_NAME: &str = "digests.bin";

/// hashvault settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Directory holding one file per unique content digest.
    pub copies_dir: PathBuf,

    /// Directory holding one subdirectory per backup run.
    pub data_dir: PathBuf,

    /// Directory holding the persistent digest cache.
    pub cache_dir: PathBuf,

    /// File or directory name patterns skipped during discovery.
    pub ignored: Vec<String>,

    /// Default number of hashing threads.
    pub threads: Option<usize>,

    /// Indent the metadata JSON documents.
    pub pretty_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            copies_dir: PathBuf::from("./backup_copies"),
            data_dir: PathBuf::from(format!("./backup_v{STORE_FORMAT_VERSION}")),
            cache_dir: PathBuf::from(format!("./.digest_cache_v{STORE_FORMAT_VERSION}")),
            ignored: vec!["$RECYCLE.BIN".to_string()],
            threads: None,
            pretty_json: false,
        }
    }
}

impl Settings {
    /// The on-disk layout described by these settings.
    #[must_use]
    pub fn layout(&self) -> StoreLayout {
        StoreLayout {
            copies_dir: self.copies_dir.clone(),
            data_dir: self.data_dir.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }

    /// Compile the ignore patterns into a matcher for entry names.
    ///
    /// # Errors
    ///
    /// * If any pattern is not a valid glob
    pub fn ignore_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignored {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source: e,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: self.ignored.join(", "),
            source: e,
        })
    }
}

/// Where backup artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Content-addressed copy store.
    pub copies_dir: PathBuf,
    /// Per-run metadata directories.
    pub data_dir: PathBuf,
    /// Digest cache directory.
    pub cache_dir: PathBuf,
}

/// Paths of the files written by a single backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// The run directory itself.
    pub dir: PathBuf,
    /// The file record list.
    pub file_info: PathBuf,
    /// The directory list.
    pub directories: PathBuf,
    /// The run log.
    pub log: PathBuf,
}

impl RunPaths {
    /// Paths inside an existing run directory.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            file_info: dir.join(FILE_INFO_NAME),
            directories: dir.join(DIRECTORIES_NAME),
            log: dir.join(RUN_LOG_NAME),
        }
    }
}

impl StoreLayout {
    /// A layout rooted at a single directory, mostly useful for tests.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            copies_dir: root.join("backup_copies"),
            data_dir: root.join(format!("backup_v{STORE_FORMAT_VERSION}")),
            cache_dir: root.join(format!(".digest_cache_v{STORE_FORMAT_VERSION}")),
        }
    }

    /// Store path of the object with the given hex digest.
    ///
    /// The file name is the digest itself, so identical content always lands
    /// on the same path.
    #[must_use]
    pub fn object_path(&self, digest_hex: &str) -> PathBuf {
        self.copies_dir.join(digest_hex)
    }

    /// Location of the binary digest cache.
    #[must_use]
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(DIGEST_CACHE_NAME)
    }

    /// Paths for the run named `name` under the data directory.
    #[must_use]
    pub fn run_paths(&self, name: &str) -> RunPaths {
        RunPaths::in_dir(&self.data_dir.join(name))
    }

    /// Create the copy store, data and cache directories.
    ///
    /// # Errors
    ///
    /// * If any directory cannot be created
    pub fn prepare(&self) -> Result<(), ConfigError> {
        for dir in [&self.copies_dir, &self.data_dir, &self.cache_dir] {
            if !dir.is_dir() {
                log::debug!("Creating directory {}", dir.display());
                fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDirError {
                    path: dir.clone(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }
}
