//! Background copy worker fed by a queue of [`CopyTask`]s.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use hashvault_pool::JobQueue;
use parking_lot::Mutex;

use crate::copy::{CopyOutcome, OverwritePolicy, place_file};
use crate::error::CopyError;
use crate::progress::{Dimension, ProgressAggregator, ProgressSink, ProgressSnapshot};

/// One file to duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// File to read.
    pub source: PathBuf,
    /// Where to write it.
    pub destination: PathBuf,
    /// Size in bytes, for progress.
    pub size: u64,
}

/// Lifecycle of a [`CopyEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Accepting tasks.
    Running,
    /// No new tasks; the worker is finishing the queue.
    Draining,
    /// Worker joined.
    Stopped,
}

/// Per-outcome task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyReport {
    /// Destinations written for the first time.
    pub copied: u64,
    /// Destinations overwritten.
    pub replaced: u64,
    /// Destinations that already existed and were kept.
    pub skipped_existing: u64,
    /// Tasks that failed and were logged.
    pub failed: u64,
}

impl CopyReport {
    /// Total tasks handled.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.copied + self.replaced + self.skipped_existing + self.failed
    }

    fn record(&mut self, outcome: CopyOutcome) {
        match outcome {
            CopyOutcome::Copied => self.copied += 1,
            CopyOutcome::Replaced => self.replaced += 1,
            CopyOutcome::AlreadyPresent => self.skipped_existing += 1,
        }
    }
}

#[derive(Debug)]
struct Shared {
    queue: JobQueue<CopyTask>,
    progress: ProgressAggregator,
    report: Mutex<CopyReport>,
    state: Mutex<EngineState>,
}

/// Cloneable producer side of a [`CopyEngine`].
#[derive(Debug, Clone)]
pub struct CopyQueueHandle {
    shared: Arc<Shared>,
}

impl CopyQueueHandle {
    /// Queue a task and grow the progress totals.
    ///
    /// # Errors
    ///
    /// * [`CopyError::EngineStopped`] if the engine has begun shutting down
    pub fn enqueue(&self, task: CopyTask) -> Result<(), CopyError> {
        let size = task.size;
        self.shared.progress.add_total(Dimension::Files, 1);
        self.shared.progress.add_total(Dimension::Bytes, size);

        self.shared.queue.push(task).map_err(|task| {
            self.shared.progress.retract_total(Dimension::Files, 1);
            self.shared.progress.retract_total(Dimension::Bytes, size);
            CopyError::EngineStopped {
                destination: task.destination,
            }
        })
    }
}

/// Single-threaded copier.
///
/// One worker thread copies tasks in FIFO order. Failures are logged with
/// source and destination and the worker moves on. Dropping the engine (or
/// calling [`finish`](Self::finish)) processes every queued task before the
/// worker is joined.
#[derive(Debug)]
pub struct CopyEngine {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CopyEngine {
    /// Start the worker thread.
    ///
    /// # Arguments
    ///
    /// * `policy` - What to do with destinations that already exist
    /// * `sink` - Receives paired file/byte progress once display is enabled
    ///
    /// # Errors
    ///
    /// * If the worker thread cannot be spawned
    pub fn start(policy: OverwritePolicy, sink: Arc<dyn ProgressSink>) -> Result<Self, CopyError> {
        let shared = Arc::new(Shared {
            queue: JobQueue::new(),
            progress: ProgressAggregator::paired(sink),
            report: Mutex::new(CopyReport::default()),
            state: Mutex::new(EngineState::Running),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("hashvault-copier".to_string())
            .spawn(move || worker_loop(&worker_shared, policy))
            .map_err(|e| CopyError::SpawnError { io_error: e })?;

        log::debug!("Copy engine started ({policy:?})");

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// A producer handle that can be moved into other threads.
    #[must_use]
    pub fn handle(&self) -> CopyQueueHandle {
        CopyQueueHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue a task.
    ///
    /// # Errors
    ///
    /// * [`CopyError::EngineStopped`] if the engine has begun shutting down
    pub fn enqueue(&self, task: CopyTask) -> Result<(), CopyError> {
        self.handle().enqueue(task)
    }

    /// Start rendering progress. Does not block.
    pub fn show_progress(&self) {
        self.shared.progress.enable_display();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.shared.state.lock()
    }

    /// Current progress counters.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.shared.progress.snapshot()
    }

    /// Drain the queue, join the worker and return the outcome counts.
    #[must_use]
    pub fn finish(mut self) -> CopyReport {
        self.stop();
        *self.shared.report.lock()
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        *self.shared.state.lock() = EngineState::Draining;
        self.shared.queue.close();

        if worker.join().is_err() {
            log::error!("Copy worker exited abnormally");
        }

        *self.shared.state.lock() = EngineState::Stopped;
        self.shared.progress.finish();
        log::debug!("Copy engine stopped");
    }
}

impl Drop for CopyEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Shared, policy: OverwritePolicy) {
    while let Some(task) = shared.queue.pop() {
        match place_file(&task.source, &task.destination, policy) {
            Ok(outcome) => {
                log::debug!(
                    "{outcome:?}: {} -> {}",
                    task.source.display(),
                    task.destination.display()
                );
                shared.report.lock().record(outcome);
            }
            Err(e) => {
                log::error!(
                    "Copy failed: {} -> {}: {e}",
                    task.source.display(),
                    task.destination.display()
                );
                shared.report.lock().failed += 1;
            }
        }
        shared.progress.advance(1, task.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingSink;
    use crate::progress::{NullSink, ProgressView};
    use std::fs;
    use tempfile::TempDir;

    fn task(source: PathBuf, destination: PathBuf) -> CopyTask {
        let size = fs::metadata(&source).map(|m| m.len()).unwrap_or(0);
        CopyTask {
            source,
            destination,
            size,
        }
    }

    #[test]
    fn test_identical_destinations_are_copied_once() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::write(dir.path().join("b.txt"), "hello").unwrap();

        let engine = CopyEngine::start(OverwritePolicy::Skip, Arc::new(NullSink)).unwrap();
        engine
            .enqueue(task(dir.path().join("a.txt"), store.join("HELLO")))
            .unwrap();
        engine
            .enqueue(task(dir.path().join("b.txt"), store.join("HELLO")))
            .unwrap();
        let report = engine.finish();

        assert_eq!(report.copied, 1);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(fs::read_dir(&store).unwrap().count(), 1);
    }

    #[test]
    fn test_overwrite_policy_replaces() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("new.txt");
        let target = dir.path().join("out/new.txt");
        fs::write(&source, "fresh").unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "stale").unwrap();

        let engine = CopyEngine::start(OverwritePolicy::Replace, Arc::new(NullSink)).unwrap();
        engine.enqueue(task(source, target.clone())).unwrap();
        let report = engine.finish();

        assert_eq!(report.replaced, 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh");
    }

    #[test]
    fn test_failure_is_counted_and_progress_advances() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.txt"), "data").unwrap();

        let engine = CopyEngine::start(OverwritePolicy::Skip, Arc::new(NullSink)).unwrap();
        engine
            .enqueue(CopyTask {
                source: dir.path().join("missing.txt"),
                destination: dir.path().join("store/MISSING"),
                size: 10,
            })
            .unwrap();
        engine
            .enqueue(task(dir.path().join("ok.txt"), dir.path().join("store/OK")))
            .unwrap();

        let handle = engine.handle();
        let report = engine.finish();

        assert_eq!(report.failed, 1);
        assert_eq!(report.copied, 1);
        assert_eq!(report.total(), 2);
        assert!(dir.path().join("store/OK").exists());

        let snapshot = handle.shared.progress.snapshot();
        assert_eq!(snapshot.files_done, 2);
        assert_eq!(snapshot.files_total, 2);
        assert_eq!(snapshot.bytes_done, 14);
        assert_eq!(snapshot.bytes_total, 14);
    }

    #[test]
    fn test_enqueue_after_finish_is_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = CopyEngine::start(OverwritePolicy::Skip, Arc::new(NullSink)).unwrap();
        let handle = engine.handle();
        let _ = engine.finish();

        let result = handle.enqueue(CopyTask {
            source: dir.path().join("x"),
            destination: dir.path().join("y"),
            size: 3,
        });

        assert!(matches!(result, Err(CopyError::EngineStopped { .. })));
        assert_eq!(*handle.shared.state.lock(), EngineState::Stopped);
        assert_eq!(handle.shared.progress.snapshot().files_total, 0);
    }

    #[test]
    fn test_handles_enqueue_from_many_threads() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        for i in 0..8 {
            fs::write(dir.path().join(format!("{i}.txt")), format!("{}", i % 3)).unwrap();
        }

        let engine = CopyEngine::start(OverwritePolicy::Skip, Arc::new(NullSink)).unwrap();
        let producers: Vec<_> = (0..8)
            .map(|i| {
                let handle = engine.handle();
                let source = dir.path().join(format!("{i}.txt"));
                let destination = store.join(format!("{}", i % 3));
                thread::spawn(move || handle.enqueue(task(source, destination)).unwrap())
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        let report = engine.finish();

        assert_eq!(report.copied, 3);
        assert_eq!(report.skipped_existing, 5);
        assert_eq!(fs::read_dir(&store).unwrap().count(), 3);
    }

    #[test]
    fn test_progress_is_rendered_when_shown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "abcd").unwrap();
        let sink = Arc::new(RecordingSink::default());

        let engine = CopyEngine::start(OverwritePolicy::Skip, sink.clone()).unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        engine.show_progress();
        engine
            .enqueue(task(dir.path().join("a.txt"), dir.path().join("store/A")))
            .unwrap();
        let _ = engine.finish();

        let views = sink.views.lock();
        assert_eq!(
            views.last(),
            Some(&ProgressView::Dual {
                files: 1.0,
                bytes: 1.0
            })
        );
        assert!(sink.finished.load(std::sync::atomic::Ordering::SeqCst));
    }
}
