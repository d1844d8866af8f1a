//! Restore a backup run from the copy store.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashvault_config::{RunPaths, StoreLayout};
use hashvault_copy::{
    CopyEngine, CopyReport, CopyTask, Dimension, OverwritePolicy, ProgressAggregator,
    ProgressSink,
};
use hashvault_record::{FileRecord, read_directories, read_records};

use crate::error::OperationError;
use crate::run_log::parse_root_line;

/// Everything [`run_restore`] needs.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// The chosen backup run directory.
    pub backup_dir: PathBuf,
    /// Roots covered by the run, from [`parse_backup_roots`].
    pub roots: Vec<PathBuf>,
    /// Absolute output directory.
    pub output: PathBuf,
    /// Store directories.
    pub layout: StoreLayout,
    /// Replace files that already exist in the output.
    pub overwrite: bool,
    /// Render progress through the sink.
    pub show_progress: bool,
}

/// Counts from a finished restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Directories created.
    pub directories_created: usize,
    /// Directories that already existed.
    pub directories_existing: usize,
    /// Directories that could not be created.
    pub directories_failed: usize,
    /// Files handed to the copy engine.
    pub files_queued: usize,
    /// Records without a digest.
    pub corrupted: usize,
    /// Records whose store object is missing.
    pub lost: usize,
    /// Copy stage outcome.
    pub copy: CopyReport,
}

/// Read the backed-up roots from a run log, in order, without duplicates.
///
/// # Errors
///
/// * If the log cannot be read
/// * [`OperationError::NoBackupRoots`] if it names no roots
pub fn parse_backup_roots(log_path: &Path) -> Result<Vec<PathBuf>, OperationError> {
    let content = fs::read_to_string(log_path).map_err(|e| OperationError::IoError {
        path: log_path.to_path_buf(),
        source: e,
    })?;

    let mut roots: Vec<PathBuf> = Vec::new();
    for root in content.lines().filter_map(parse_root_line) {
        if !roots.contains(&root) {
            roots.push(root);
        }
    }

    if roots.is_empty() {
        return Err(OperationError::NoBackupRoots {
            log: log_path.to_path_buf(),
        });
    }
    Ok(roots)
}

/// Where `path` is restored to, if it lies under one of `roots`.
///
/// The result keeps the root's own name: `/home/me/photos/a.jpg` under root
/// `/home/me/photos` goes to `<output>/photos/a.jpg`. The first matching root
/// wins. Matching is component-wise.
#[must_use]
pub fn restore_target(path: &Path, roots: &[PathBuf], output: &Path) -> Option<PathBuf> {
    let root = roots.iter().find(|root| path.starts_with(root))?;
    let base = root.parent().unwrap_or(root);
    let relative = path.strip_prefix(base).ok()?;
    Some(output.join(relative))
}

/// Recreate the directories and files of a backup run under `output`.
///
/// Records without a digest are logged as corrupted, records whose store
/// object is gone are logged as lost. Both are skipped. Records outside every
/// root are ignored.
///
/// # Errors
///
/// * If the run's metadata documents cannot be read
/// * If the output directory cannot be created
/// * If the copy worker cannot start
pub fn run_restore(
    request: &RestoreRequest,
    sink: Arc<dyn ProgressSink>,
) -> Result<RestoreSummary, OperationError> {
    let run = RunPaths::in_dir(&request.backup_dir);
    let directories = read_directories(&run.directories)?;
    let records = read_records(&run.file_info)?;

    fs::create_dir_all(&request.output).map_err(|e| OperationError::IoError {
        path: request.output.clone(),
        source: e,
    })?;

    log::info!(
        "Restoring {} into {} (overwrite: {})",
        request.backup_dir.display(),
        request.output.display(),
        request.overwrite
    );

    let mut summary = RestoreSummary::default();
    create_directories(&directories, request, Arc::clone(&sink), &mut summary);
    copy_files(&records, request, sink, &mut summary)?;

    log::info!(
        "Restore done: {} directories created, {} files copied, {} replaced, {} kept, {} failed",
        summary.directories_created,
        summary.copy.copied,
        summary.copy.replaced,
        summary.copy.skipped_existing,
        summary.copy.failed
    );

    Ok(summary)
}

fn create_directories(
    directories: &[PathBuf],
    request: &RestoreRequest,
    sink: Arc<dyn ProgressSink>,
    summary: &mut RestoreSummary,
) {
    let progress = ProgressAggregator::single(sink);
    progress.add_total(Dimension::Files, directories.len() as u64);
    if request.show_progress {
        progress.enable_display();
    }

    for dir in directories {
        if let Some(target) = restore_target(dir, &request.roots, &request.output) {
            if target.is_dir() {
                log::info!("Directory already exists: {}", target.display());
                summary.directories_existing += 1;
            } else if let Err(e) = fs::create_dir_all(&target) {
                log::error!("Failed to create directory {}: {e}", target.display());
                summary.directories_failed += 1;
            } else {
                summary.directories_created += 1;
            }
        }
        progress.accumulate(Dimension::Files, 1);
    }

    progress.finish();
}

fn copy_files(
    records: &[FileRecord],
    request: &RestoreRequest,
    sink: Arc<dyn ProgressSink>,
    summary: &mut RestoreSummary,
) -> Result<(), OperationError> {
    let policy = if request.overwrite {
        OverwritePolicy::Replace
    } else {
        OverwritePolicy::Skip
    };
    let engine = CopyEngine::start(policy, sink)?;

    for record in records {
        let Some(target) = restore_target(&record.path, &request.roots, &request.output) else {
            log::debug!("Outside backed up roots: {}", record.path.display());
            continue;
        };

        if !record.has_digest() {
            log::error!("FileInfo corrupted: {}", describe(record));
            summary.corrupted += 1;
            continue;
        }

        let object = request.layout.object_path(&record.digest);
        if !object.is_file() {
            log::error!("Backup lost: {}", describe(record));
            summary.lost += 1;
            continue;
        }

        engine.enqueue(CopyTask {
            source: object,
            destination: target,
            size: record.size,
        })?;
        summary.files_queued += 1;
    }

    if request.show_progress {
        engine.show_progress();
    }
    summary.copy = engine.finish();
    Ok(())
}

fn describe(record: &FileRecord) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| record.path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashvault_copy::NullSink;
    use hashvault_record::{write_directories, write_records};
    use tempfile::TempDir;

    #[test]
    fn test_restore_target_keeps_root_name() {
        let roots = vec![PathBuf::from("/home/me/photos"), PathBuf::from("/srv/docs")];
        let output = Path::new("/restore");

        assert_eq!(
            restore_target(Path::new("/home/me/photos/2024/a.jpg"), &roots, output),
            Some(PathBuf::from("/restore/photos/2024/a.jpg"))
        );
        assert_eq!(
            restore_target(Path::new("/srv/docs"), &roots, output),
            Some(PathBuf::from("/restore/docs"))
        );
        assert_eq!(
            restore_target(Path::new("/home/me/photos-old/a.jpg"), &roots, output),
            None
        );
        assert_eq!(restore_target(Path::new("/etc/passwd"), &roots, output), None);
    }

    #[test]
    fn test_parse_backup_roots() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log.txt");
        fs::write(
            &log,
            "[INFO] Folder path: /a\n[INFO] Folder path: /b\n[INFO] skipped: /a/x\n[INFO] Folder path: /a\n",
        )
        .unwrap();

        assert_eq!(
            parse_backup_roots(&log).unwrap(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_parse_backup_roots_without_roots() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log.txt");
        fs::write(&log, "[INFO] Found 0 directories and 0 files\n").unwrap();

        assert!(matches!(
            parse_backup_roots(&log),
            Err(OperationError::NoBackupRoots { .. })
        ));
        assert!(matches!(
            parse_backup_roots(&dir.path().join("missing.txt")),
            Err(OperationError::IoError { .. })
        ));
    }

    struct Backup {
        dir: TempDir,
        layout: StoreLayout,
        run: RunPaths,
        root: PathBuf,
    }

    fn backup() -> Backup {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::rooted_at(&dir.path().join("store"));
        layout.prepare().unwrap();
        let run = layout.run_paths("run");
        fs::create_dir_all(&run.dir).unwrap();

        let root = PathBuf::from("/origin/photos");
        fs::write(layout.object_path("HELLO"), "hello").unwrap();

        write_directories(
            &run.directories,
            &[root.clone(), root.join("empty"), root.join("sub")],
            false,
        )
        .unwrap();
        let record = |path: PathBuf, digest: &str| FileRecord {
            path,
            modified: 0,
            size: 5,
            digest: digest.to_string(),
        };
        write_records(
            &run.file_info,
            &[
                record(root.join("a.txt"), "HELLO"),
                record(root.join("sub/b.txt"), "HELLO"),
                record(root.join("broken.txt"), ""),
                record(root.join("lost.txt"), "GONE"),
                record(PathBuf::from("/elsewhere/x.txt"), "HELLO"),
            ],
            false,
        )
        .unwrap();

        Backup {
            dir,
            layout,
            run,
            root,
        }
    }

    fn request(backup: &Backup, overwrite: bool) -> RestoreRequest {
        RestoreRequest {
            backup_dir: backup.run.dir.clone(),
            roots: vec![backup.root.clone()],
            output: backup.dir.path().join("out"),
            layout: backup.layout.clone(),
            overwrite,
            show_progress: false,
        }
    }

    #[test]
    fn test_run_restore() {
        let backup = backup();
        let req = request(&backup, false);

        let summary = run_restore(&req, Arc::new(NullSink)).unwrap();

        let out = req.output.join("photos");
        assert!(out.join("empty").is_dir());
        assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(out.join("sub/b.txt")).unwrap(), "hello");
        assert!(!out.join("broken.txt").exists());
        assert!(!out.join("lost.txt").exists());
        assert!(!req.output.join("elsewhere").exists());

        assert_eq!(summary.directories_created, 3);
        assert_eq!(summary.files_queued, 2);
        assert_eq!(summary.corrupted, 1);
        assert_eq!(summary.lost, 1);
        assert_eq!(summary.copy.copied, 2);
    }

    #[test]
    fn test_restore_respects_overwrite_policy() {
        let backup = backup();
        let out = backup.dir.path().join("out/photos");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("a.txt"), "local edit").unwrap();

        let kept = run_restore(&request(&backup, false), Arc::new(NullSink)).unwrap();
        assert_eq!(kept.copy.skipped_existing, 1);
        assert_eq!(kept.directories_existing, 1);
        assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "local edit");

        let replaced = run_restore(&request(&backup, true), Arc::new(NullSink)).unwrap();
        assert_eq!(replaced.copy.replaced, 2);
        assert_eq!(fs::read_to_string(out.join("a.txt")).unwrap(), "hello");
    }
}
