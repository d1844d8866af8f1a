//! Single-file placement into a content-addressed store.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CopyError;

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Leave the existing file alone. The copy counts as done.
    #[default]
    Skip,
    /// Delete the existing file and copy again.
    Replace,
}

/// Result of placing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The destination did not exist and was written.
    Copied,
    /// The destination existed and was kept.
    AlreadyPresent,
    /// The destination existed and was replaced.
    Replaced,
}

/// Copy `source` to `destination` according to `policy`.
///
/// The parent of `destination` is created if needed. Data is written to a
/// sibling `.partial` file first and renamed into place, so an interrupted
/// copy never leaves a truncated file under the final name.
///
/// # Arguments
///
/// * `source` - Source file path
/// * `destination` - Target file path
/// * `policy` - Behavior when `destination` exists
///
/// # Errors
///
/// * If the parent directory cannot be created
/// * If an existing destination cannot be removed under [`OverwritePolicy::Replace`]
/// * If the copy or the final rename fails
pub fn place_file(
    source: &Path,
    destination: &Path,
    policy: OverwritePolicy,
) -> Result<CopyOutcome, CopyError> {
    let existed = destination.exists();

    if existed && policy == OverwritePolicy::Skip {
        log::trace!("Already present: {}", destination.display());
        return Ok(CopyOutcome::AlreadyPresent);
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| CopyError::CreateDirError {
            path: parent.to_path_buf(),
            io_error: e,
        })?;
    }

    let staged = staging_path(destination);
    if let Err(e) = copy_file_with_reflink(source, &staged) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }

    if existed {
        fs::remove_file(destination).map_err(|e| CopyError::RemoveError {
            path: destination.to_path_buf(),
            io_error: e,
        })?;
    }

    fs::rename(&staged, destination).map_err(|e| CopyError::RenameError {
        from: staged.clone(),
        to: destination.to_path_buf(),
        io_error: e,
    })?;

    Ok(if existed {
        CopyOutcome::Replaced
    } else {
        CopyOutcome::Copied
    })
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(".partial");
    destination.with_file_name(name)
}

/// Copy a single file, trying reflink first then falling back to regular copy.
fn copy_file_with_reflink(source: &Path, target: &Path) -> Result<(), CopyError> {
    if reflink_copy::reflink(source, target).is_ok() {
        log::trace!("Reflinked {} -> {}", source.display(), target.display());
        return Ok(());
    }

    fs::copy(source, target).map_err(|e| CopyError::FileCopyError {
        source_path: source.to_path_buf(),
        target_path: target.to_path_buf(),
        io_error: e,
    })?;
    log::trace!("Copied {} -> {}", source.display(), target.display());
    Ok(())
}
