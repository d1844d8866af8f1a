//! Backup pipeline: hash on a worker pool, copy on a single worker, check.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use hashvault_config::{RunPaths, StoreLayout};
use hashvault_copy::{
    CopyEngine, CopyQueueHandle, CopyReport, CopyTask, Dimension, OverwritePolicy,
    ProgressAggregator, ProgressSink,
};
use hashvault_digest::{CacheMode, ContentHasher, DigestCache};
use hashvault_pool::TaskPool;
use hashvault_record::{FileRecord, write_directories, write_records};

use crate::discover::SourceTree;
use crate::error::OperationError;
use crate::integrity::{IntegrityReport, check_integrity, referenced_digests};

/// Most roots whose names are appended to the run directory name.
pub const MAX_NAMED_ROOTS: usize = 5;

/// Everything [`run_backup`] needs.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Discovered sources.
    pub tree: SourceTree,
    /// Store directories.
    pub layout: StoreLayout,
    /// Output files of this run, from [`prepare_run`].
    pub run: RunPaths,
    /// Hashing worker count.
    pub threads: usize,
    /// How cached digests are used.
    pub cache_mode: CacheMode,
    /// Indent the JSON documents.
    pub pretty_json: bool,
    /// Render progress through the sink.
    pub show_progress: bool,
}

/// Counts from a finished backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Directories recorded.
    pub directories: usize,
    /// Files discovered.
    pub files_found: usize,
    /// Bytes across all readable files.
    pub bytes_total: u64,
    /// Files with a digest.
    pub hashed: usize,
    /// Files that could not be read or hashed.
    pub failed: usize,
    /// Copy stage outcome.
    pub copy: CopyReport,
    /// Integrity stage outcome.
    pub integrity: IntegrityReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashOutcome {
    Hashed,
    Failed,
    Inconsistent,
}

/// Create the store directories and the directory for run `name`.
///
/// # Errors
///
/// * If any directory cannot be created
pub fn prepare_run(layout: &StoreLayout, name: &str) -> Result<RunPaths, OperationError> {
    layout.prepare()?;
    let run = layout.run_paths(name);
    fs::create_dir_all(&run.dir).map_err(|e| OperationError::IoError {
        path: run.dir.clone(),
        source: e,
    })?;
    log::debug!("Run directory: {}", run.dir.display());
    Ok(run)
}

/// Final name for a run directory: the timestamp, plus `_<root name>` for
/// each root when there are at most [`MAX_NAMED_ROOTS`] of them.
#[must_use]
pub fn run_dir_name(stamp: &str, roots: &[PathBuf]) -> String {
    let mut name = stamp.to_string();
    if roots.len() <= MAX_NAMED_ROOTS {
        for root in roots {
            if let Some(file_name) = root.file_name() {
                name.push('_');
                name.push_str(&file_name.to_string_lossy());
            }
        }
    }
    name
}

/// Rename the run directory to [`run_dir_name`]. The run log must be closed.
///
/// # Errors
///
/// * If the rename fails
pub fn finalize_run(run: &RunPaths, stamp: &str, roots: &[PathBuf]) -> Result<PathBuf, OperationError> {
    let name = run_dir_name(stamp, roots);
    let target = run
        .dir
        .parent()
        .map_or_else(|| PathBuf::from(&name), |parent| parent.join(&name));

    if target == run.dir {
        return Ok(target);
    }

    fs::rename(&run.dir, &target).map_err(|e| OperationError::IoError {
        path: run.dir.clone(),
        source: e,
    })?;
    log::debug!("Renamed run directory to {}", target.display());
    Ok(target)
}

/// Run the backup pipeline over an already discovered tree.
///
/// Stages, in order:
///
/// 1. Build a [`FileRecord`] per file (files whose metadata cannot be read
///    keep an empty record and are not hashed)
/// 2. Hash every record on a [`TaskPool`]; each finished hash immediately
///    queues a copy into the content-addressed store on a [`CopyEngine`]
/// 3. Write `file_info.json` and `directories.json`
/// 4. Drain the copy engine
/// 5. Check integrity of every hashed record
/// 6. Persist the digest cache
///
/// Per-file failures are logged and counted. With [`CacheMode::Verify`], any
/// cached digest that disagrees with the file content aborts the run after
/// stage 2.
///
/// # Errors
///
/// * If the worker pool or copy worker cannot start
/// * If verification found an inconsistent digest cache
/// * If a metadata document cannot be written
pub fn run_backup(
    request: BackupRequest,
    sink: Arc<dyn ProgressSink>,
) -> Result<BackupSummary, OperationError> {
    let BackupRequest {
        tree,
        layout,
        run,
        threads,
        cache_mode,
        pretty_json,
        show_progress,
    } = request;

    let mut summary = BackupSummary {
        directories: tree.directories.len(),
        files_found: tree.files.len(),
        ..BackupSummary::default()
    };

    let (mut records, readable) = collect_records(&tree.files);
    let unreadable = readable.iter().filter(|ok| !**ok).count();
    if unreadable > 0 {
        log::warn!("{unreadable} file(s) could not be read and will have no backup copy");
    }
    summary.bytes_total = records.iter().map(|r| r.size).sum();
    log::info!(
        "Hashing {} files ({} bytes) on {threads} threads",
        records.len(),
        summary.bytes_total
    );

    let cache = Arc::new(load_cache(&layout.cache_file()));
    let hasher = Arc::new(ContentHasher::new(Arc::clone(&cache), cache_mode));
    let engine = CopyEngine::start(OverwritePolicy::Skip, Arc::clone(&sink))?;
    let layout = Arc::new(layout);

    let progress = Arc::new(ProgressAggregator::paired(Arc::clone(&sink)));
    progress.add_total(Dimension::Files, records.len() as u64);
    progress.add_total(Dimension::Bytes, summary.bytes_total);
    if show_progress {
        progress.enable_display();
    }

    let (sender, receiver) = mpsc::channel();
    {
        let pool = TaskPool::new(threads)?;
        for (index, record) in records.iter().enumerate() {
            if !readable[index] {
                progress.advance(1, 0);
                continue;
            }
            let mut record = record.clone();
            let hasher = Arc::clone(&hasher);
            let queue = engine.handle();
            let layout = Arc::clone(&layout);
            let progress = Arc::clone(&progress);
            let sender = sender.clone();

            pool.submit(move || {
                let outcome = hash_and_queue(&hasher, &queue, &layout, &mut record);
                progress.advance(1, record.size);
                let _ = sender.send((index, outcome, record.digest));
            });
        }
        pool.join();
    }
    drop(sender);
    progress.finish();

    let mut reported = 0_usize;
    let mut inconsistent = 0_usize;
    for (index, outcome, digest) in receiver.try_iter() {
        reported += 1;
        match outcome {
            HashOutcome::Hashed => {
                summary.hashed += 1;
                records[index].digest = digest;
            }
            HashOutcome::Failed => {}
            HashOutcome::Inconsistent => inconsistent += 1,
        }
    }
    if reported < records.len() {
        log::error!("{} hashing task(s) did not report back", records.len() - reported);
    }
    summary.failed = tree.files.len() - summary.hashed - inconsistent;

    if inconsistent > 0 {
        let pending = engine.progress();
        log::warn!(
            "Finishing {} queued copies before aborting",
            pending.files_total.saturating_sub(pending.files_done)
        );
        let copied = engine.finish();
        log::info!("Copied {} files before aborting", copied.copied);
        return Err(OperationError::CacheInconsistent {
            count: inconsistent,
        });
    }
    log::info!("Hashed {} files, {} failed", summary.hashed, summary.failed);

    write_records(&run.file_info, &records, pretty_json)?;
    write_directories(&run.directories, &tree.directories, pretty_json)?;
    log::info!("Wrote {} and {}", run.file_info.display(), run.directories.display());

    if show_progress {
        engine.show_progress();
    }
    summary.copy = engine.finish();
    log::info!(
        "Copied {} files, {} already stored, {} failed",
        summary.copy.copied,
        summary.copy.skipped_existing,
        summary.copy.failed
    );

    let other_runs = referenced_digests(&layout.data_dir, &run.dir);
    summary.integrity = check_integrity(&records, &layout, &other_runs);

    match cache.persist() {
        Ok(()) => log::debug!("Persisted {} cached digests", cache.len()),
        Err(e) => log::error!("{e}"),
    }

    Ok(summary)
}

/// One record per file, plus whether its metadata could be read.
///
/// An unreadable file keeps a zeroed record with an empty digest so the run
/// metadata still lists it.
fn collect_records(files: &[PathBuf]) -> (Vec<FileRecord>, Vec<bool>) {
    files
        .iter()
        .map(|path| match FileRecord::from_path(path) {
            Ok(record) => (record, true),
            Err(e) => {
                log::error!("{e}");
                let record = FileRecord {
                    path: path.clone(),
                    modified: 0,
                    size: 0,
                    digest: String::new(),
                };
                (record, false)
            }
        })
        .unzip()
}

fn load_cache(path: &Path) -> DigestCache {
    match DigestCache::load(path) {
        Ok(cache) => {
            log::debug!("Loaded {} cached digests from {}", cache.len(), path.display());
            cache
        }
        Err(e) => {
            log::warn!("{e}; starting with an empty digest cache");
            DigestCache::empty(path)
        }
    }
}

fn hash_and_queue(
    hasher: &ContentHasher,
    queue: &CopyQueueHandle,
    layout: &StoreLayout,
    record: &mut FileRecord,
) -> HashOutcome {
    match hasher.hash(record) {
        Ok(digest) => {
            let task = CopyTask {
                source: record.path.clone(),
                destination: layout.object_path(&digest.to_hex()),
                size: record.size,
            };
            if let Err(e) = queue.enqueue(task) {
                log::error!("{e}");
            }
            HashOutcome::Hashed
        }
        Err(e) => {
            log::error!("{e}");
            if e.is_inconsistency() {
                HashOutcome::Inconsistent
            } else {
                HashOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::GlobSet;
    use hashvault_copy::{NullSink, ProgressView};
    use hashvault_digest::{Digest, IdentityKey};
    use hashvault_record::read_records;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    use crate::discover::discover;
    use crate::restore::{RestoreRequest, run_restore};

    #[derive(Default)]
    struct LastView(Mutex<Option<ProgressView>>);

    impl ProgressSink for LastView {
        fn render(&self, view: ProgressView) {
            *self.0.lock() = Some(view);
        }
    }

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        layout: StoreLayout,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("a.txt"), "hello").unwrap();
        fs::write(source.join("b.txt"), "hello").unwrap();
        fs::write(source.join("sub/c.txt"), "world").unwrap();
        let layout = StoreLayout::rooted_at(&dir.path().join("store"));
        Fixture {
            _dir: dir,
            source,
            layout,
        }
    }

    fn request(fixture: &Fixture, run_name: &str, threads: usize, cache_mode: CacheMode) -> BackupRequest {
        BackupRequest {
            tree: discover(&[fixture.source.clone()], &GlobSet::empty()),
            layout: fixture.layout.clone(),
            run: prepare_run(&fixture.layout, run_name).unwrap(),
            threads,
            cache_mode,
            pretty_json: false,
            show_progress: false,
        }
    }

    fn store_objects(layout: &StoreLayout) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&layout.copies_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_identical_content_is_stored_once() {
        let fixture = fixture();
        let req = request(&fixture, "run1", 4, CacheMode::Disabled);
        let file_info = req.run.file_info.clone();

        let summary = run_backup(req, Arc::new(NullSink)).unwrap();

        assert_eq!(summary.files_found, 3);
        assert_eq!(summary.hashed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.copy.copied, 2);
        assert_eq!(summary.copy.skipped_existing, 1);
        assert!(summary.integrity.is_clean());

        let hello = Digest::of_bytes(b"hello").to_hex();
        let world = Digest::of_bytes(b"world").to_hex();
        let mut expected = vec![hello.clone(), world];
        expected.sort();
        assert_eq!(store_objects(&fixture.layout), expected);

        let records = read_records(&file_info).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].digest, hello);
        assert_eq!(records[1].digest, hello);
        assert!(fixture.layout.cache_file().exists());
    }

    #[test]
    fn test_second_run_copies_nothing() {
        let fixture = fixture();
        run_backup(request(&fixture, "run1", 2, CacheMode::Trust), Arc::new(NullSink)).unwrap();

        let second =
            run_backup(request(&fixture, "run2", 2, CacheMode::Trust), Arc::new(NullSink)).unwrap();

        assert_eq!(second.hashed, 3);
        assert_eq!(second.copy.copied, 0);
        assert_eq!(second.copy.skipped_existing, 3);
        assert_eq!(store_objects(&fixture.layout).len(), 2);
    }

    #[test]
    fn test_verify_mode_rejects_inconsistent_cache() {
        let fixture = fixture();
        let record = FileRecord::from_path(&fixture.source.join("a.txt")).unwrap();
        fixture.layout.prepare().unwrap();
        let cache = DigestCache::empty(&fixture.layout.cache_file());
        cache.store(IdentityKey::of(&record), Digest::of_bytes(b"not hello"));
        cache.persist().unwrap();

        let req = request(&fixture, "run1", 2, CacheMode::Verify);
        let file_info = req.run.file_info.clone();
        let result = run_backup(req, Arc::new(NullSink));

        assert!(matches!(
            result,
            Err(OperationError::CacheInconsistent { count: 1 })
        ));
        assert!(!file_info.exists());

        // b.txt and c.txt hashed cleanly; their queued copies still complete
        let mut expected = vec![
            Digest::of_bytes(b"hello").to_hex(),
            Digest::of_bytes(b"world").to_hex(),
        ];
        expected.sort();
        assert_eq!(store_objects(&fixture.layout), expected);
    }

    #[test]
    fn test_vanished_file_is_recorded_without_digest() {
        let fixture = fixture();
        let mut req = request(&fixture, "run1", 2, CacheMode::Disabled);
        req.show_progress = true;
        let file_info = req.run.file_info.clone();
        let vanished = fixture.source.join("sub/c.txt");
        fs::remove_file(&vanished).unwrap();
        let sink = Arc::new(LastView::default());

        let summary = run_backup(req, sink.clone()).unwrap();

        assert_eq!(summary.files_found, 3);
        assert_eq!(summary.hashed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.copy.copied, 1);
        assert_eq!(summary.copy.skipped_existing, 1);
        assert_eq!(summary.integrity.unhashed, vec![vanished.clone()]);
        assert!(summary.integrity.is_clean());

        let records = read_records(&file_info).unwrap();
        assert_eq!(records.len(), 3);
        let missing = records.iter().find(|r| r.path == vanished).unwrap();
        assert!(!missing.has_digest());
        assert_eq!(
            *sink.0.lock(),
            Some(ProgressView::Dual {
                files: 1.0,
                bytes: 1.0
            })
        );
    }

    #[test]
    fn test_earlier_run_survives_later_integrity_failure() {
        let fixture = fixture();
        let first = request(&fixture, "run1", 2, CacheMode::Disabled);
        let first_dir = first.run.dir.clone();
        run_backup(first, Arc::new(NullSink)).unwrap();

        // a.txt touched after the second run hashed it
        let mut touched = FileRecord::from_path(&fixture.source.join("a.txt")).unwrap();
        touched.modified += 100;
        touched.digest = Digest::of_bytes(b"hello").to_hex();
        let second = prepare_run(&fixture.layout, "run2").unwrap();
        let other_runs = referenced_digests(&fixture.layout.data_dir, &second.dir);
        let report = check_integrity(&[touched], &fixture.layout, &other_runs);

        assert_eq!(report.issues.len(), 1);
        assert!(report.removed.is_empty());
        assert_eq!(report.retained, vec![Digest::of_bytes(b"hello").to_hex()]);

        let output = fixture._dir.path().join("out");
        let restored = run_restore(
            &RestoreRequest {
                backup_dir: first_dir,
                roots: vec![fixture.source.clone()],
                output: output.clone(),
                layout: fixture.layout.clone(),
                overwrite: false,
                show_progress: false,
            },
            Arc::new(NullSink),
        )
        .unwrap();

        assert_eq!(restored.lost, 0);
        assert_eq!(restored.copy.copied, 3);
        assert_eq!(fs::read_to_string(output.join("data/a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_trust_mode_uses_cached_digest() {
        let fixture = fixture();
        let record = FileRecord::from_path(&fixture.source.join("a.txt")).unwrap();
        fixture.layout.prepare().unwrap();
        let planted = Digest::of_bytes(b"planted");
        let cache = DigestCache::empty(&fixture.layout.cache_file());
        cache.store(IdentityKey::of(&record), planted);
        cache.persist().unwrap();

        let req = request(&fixture, "run1", 1, CacheMode::Trust);
        let file_info = req.run.file_info.clone();
        run_backup(req, Arc::new(NullSink)).unwrap();

        let records = read_records(&file_info).unwrap();
        assert_eq!(records[0].digest, planted.to_hex());
    }

    #[test]
    fn test_run_dir_name() {
        let roots = vec![PathBuf::from("/home/me/photos"), PathBuf::from("/srv/docs")];
        assert_eq!(
            run_dir_name("2024_05_01_10_00_00", &roots),
            "2024_05_01_10_00_00_photos_docs"
        );

        let many: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("/r{i}"))).collect();
        assert_eq!(run_dir_name("stamp", &many), "stamp");
    }

    #[test]
    fn test_finalize_run_renames() {
        let fixture = fixture();
        let run = prepare_run(&fixture.layout, "2024_05_01_10_00_00").unwrap();
        fs::write(&run.log, "[INFO] done\n").unwrap();

        let renamed =
            finalize_run(&run, "2024_05_01_10_00_00", &[fixture.source.clone()]).unwrap();

        assert_eq!(
            renamed,
            fixture.layout.data_dir.join("2024_05_01_10_00_00_data")
        );
        assert!(renamed.join("log.txt").exists());
        assert!(!run.dir.exists());
    }
}
