//! Settings file discovery.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_NAME: &str = "hashvault.toml";

/// Find the settings file to use.
///
/// Looks for `hashvault.toml` in `cwd` first, then for
/// `hashvault/config.toml` in the platform config directory.
#[must_use]
pub fn discover_settings_file(cwd: &Path) -> Option<PathBuf> {
    let local = cwd.join(LOCAL_CONFIG_NAME);
    if local.is_file() {
        log::debug!("Found local settings at {}", local.display());
        return Some(local);
    }

    let global = dirs::config_dir()?.join("hashvault").join("config.toml");
    if global.is_file() {
        log::debug!("Found user settings at {}", global.display());
        return Some(global);
    }

    None
}
