//! Source tree discovery.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use path_clean::PathClean;

use crate::run_log::ROOT_MARKER;

/// Everything found under the requested roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    /// Absolute roots that exist, in request order, without duplicates.
    pub roots: Vec<PathBuf>,
    /// Every directory, roots included, sorted.
    pub directories: Vec<PathBuf>,
    /// Every regular file, sorted.
    pub files: Vec<PathBuf>,
}

/// Make `path` absolute against `base` and normalize `.` and `..`.
#[must_use]
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        base.join(path).clean()
    }
}

/// Walk every root and collect its directories and regular files.
///
/// Entries whose file name matches `ignore` are skipped and not descended
/// into. Symlinks and paths that are not valid UTF-8 are skipped. Missing
/// roots and unreadable entries are logged and left out.
///
/// Each accepted root is logged at info level as `Folder path: <root>` so
/// restore can recover it from the run log.
///
/// # Arguments
///
/// * `roots` - Directories to walk; relative paths resolve against the
///   current directory
/// * `ignore` - Entry name patterns to skip
#[must_use]
pub fn discover(roots: &[PathBuf], ignore: &GlobSet) -> SourceTree {
    let cwd = std::env::current_dir().unwrap_or_default();
    let mut tree = SourceTree::default();

    for root in roots {
        let absolute = absolutize(root, &cwd);
        if !absolute.is_dir() {
            log::warn!("Source is not a directory, skipped: {}", absolute.display());
            continue;
        }
        if absolute.to_str().is_none() {
            log::warn!("Source path is not valid UTF-8, skipped: {}", absolute.display());
            continue;
        }
        if tree.roots.contains(&absolute) {
            continue;
        }
        log::info!("{ROOT_MARKER}{}", absolute.display());
        tree.roots.push(absolute);
    }

    let mut directories = BTreeSet::new();
    let mut files = BTreeSet::new();

    for root in &tree.roots {
        walk_root(root, ignore, &mut directories, &mut files);
    }

    tree.directories = directories.into_iter().collect();
    tree.files = files.into_iter().collect();

    log::info!(
        "Found {} directories and {} files",
        tree.directories.len(),
        tree.files.len()
    );

    tree
}

fn walk_root(
    root: &Path,
    ignore: &GlobSet,
    directories: &mut BTreeSet<PathBuf>,
    files: &mut BTreeSet<PathBuf>,
) {
    log::debug!("Walking {}", root.display());

    let ignore = ignore.clone();
    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| {
                let Ok(entry) = child else {
                    return true;
                };
                if ignore.is_match(&entry.file_name) {
                    log::info!("skipped: {}", entry.path().display());
                    return false;
                }
                true
            });
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("Failed to read entry under {}: {e}", root.display());
                continue;
            }
        };

        let path = entry.path();
        if path.to_str().is_none() {
            log::warn!("Path is not valid UTF-8, skipped: {}", path.display());
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            directories.insert(path);
        } else if file_type.is_file() {
            files.insert(path);
        } else {
            log::debug!("Not a regular file, skipped: {}", path.display());
        }
    }
}
