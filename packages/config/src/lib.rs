//! Configuration loading for hashvault.
//!
//! This crate provides the settings type, the TOML loader and the on-disk
//! layout of the backup store.
//!
//! # Lookup order
//!
//! * An explicit path passed by the caller
//! * `hashvault.toml` in the working directory
//! * `hashvault/config.toml` in the platform config directory
//! * Built-in defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use hashvault_config::Settings;
//!
//! let settings = Settings::load(None, &std::env::current_dir()?)?;
//! let layout = settings.layout();
//! layout.prepare()?;
//! println!("copies live in {}", layout.copies_dir.display());
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod discovery;
mod error;
mod toml_loader;
mod types;

pub use discovery::{LOCAL_CONFIG_NAME, discover_settings_file};
pub use error::ConfigError;
pub use toml_loader::load_toml_settings;
pub use types::{
    DIGEST_CACHE_NAME, DIRECTORIES_NAME, FILE_INFO_NAME, RUN_LOG_NAME, RunPaths,
    STORE_FORMAT_VERSION, Settings, StoreLayout,
};

use std::path::Path;

impl Settings {
    /// Load settings, preferring `explicit` over discovered files.
    ///
    /// # Arguments
    ///
    /// * `explicit` - Settings file requested by the user, if any
    /// * `cwd` - Directory searched for a local settings file
    ///
    /// # Errors
    ///
    /// * If the explicit file does not exist
    /// * If a settings file cannot be read or parsed
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return load_toml_settings(path);
        }

        match discover_settings_file(cwd) {
            Some(path) => load_toml_settings(&path),
            None => {
                log::debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
