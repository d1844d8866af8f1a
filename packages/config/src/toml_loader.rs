//! TOML configuration file loader.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::Settings;

/// Load a TOML settings file.
///
/// Missing keys fall back to their defaults. A copy store that shares its
/// directory with the run data is accepted with a warning.
///
/// # Arguments
///
/// * `path` - Path to the TOML settings file
///
/// # Errors
///
/// * If the file cannot be read
/// * If the file cannot be parsed as TOML
pub fn load_toml_settings(path: &Path) -> Result<Settings, ConfigError> {
    log::debug!("Loading TOML settings from {}", path.display());

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let settings: Settings =
        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    log::debug!(
        "Settings from {}: copies in {}, runs in {}, digest cache in {}, {} ignore pattern(s)",
        path.display(),
        settings.copies_dir.display(),
        settings.data_dir.display(),
        settings.cache_dir.display(),
        settings.ignored.len()
    );
    if settings.copies_dir == settings.data_dir {
        log::warn!(
            "{}: copiesDir and dataDir are both {}",
            path.display(),
            settings.copies_dir.display()
        );
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_toml_settings() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
copiesDir = "/mnt/vault/copies"
dataDir = "/mnt/vault/runs"
cacheDir = "/mnt/vault/cache"
ignored = ["$RECYCLE.BIN", "*.tmp"]
threads = 8
prettyJson = true
"#
        )
        .unwrap();

        let settings = load_toml_settings(file.path()).unwrap();

        assert_eq!(settings.copies_dir, PathBuf::from("/mnt/vault/copies"));
        assert_eq!(settings.data_dir, PathBuf::from("/mnt/vault/runs"));
        assert_eq!(settings.cache_dir, PathBuf::from("/mnt/vault/cache"));
        assert_eq!(settings.ignored, vec!["$RECYCLE.BIN", "*.tmp"]);
        assert_eq!(settings.threads, Some(8));
        assert!(settings.pretty_json);
    }

    #[test]
    fn test_load_minimal_toml_settings() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "threads = 2").unwrap();

        let settings = load_toml_settings(file.path()).unwrap();

        assert_eq!(settings.threads, Some(2));
        assert_eq!(settings.copies_dir, Settings::default().copies_dir);
        assert_eq!(settings.ignored, Settings::default().ignored);
        assert!(!settings.pretty_json);
    }

    #[test]
    fn test_shared_store_directory_still_loads() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "copiesDir = \"/vault\"\ndataDir = \"/vault\"").unwrap();

        let settings = load_toml_settings(file.path()).unwrap();

        assert_eq!(settings.copies_dir, settings.data_dir);
        assert_eq!(settings.cache_dir, Settings::default().cache_dir);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "threads = \"many\"").unwrap();

        assert!(matches!(
            load_toml_settings(file.path()),
            Err(ConfigError::TomlParseError { .. })
        ));
    }
}
