//! Fixed-size pool of persistent worker threads.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::PoolError;
use crate::queue::JobQueue;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted closures on a fixed number of threads.
///
/// The queue is unbounded and [`submit`](Self::submit) never blocks. Dropping
/// the pool (or calling [`join`](Self::join)) runs every task already queued
/// before the workers exit.
pub struct TaskPool {
    queue: Arc<JobQueue<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskPool {
    /// Start `workers` threads.
    ///
    /// # Errors
    ///
    /// * If `workers` is zero
    /// * If a thread cannot be spawned; threads already started are shut down
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        let mut pool = Self {
            queue: Arc::new(JobQueue::new()),
            workers: Vec::with_capacity(workers),
        };

        for index in 0..workers {
            let queue = Arc::clone(&pool.queue);
            let handle = thread::Builder::new()
                .name(format!("hashvault-worker-{index}"))
                .spawn(move || worker_loop(&queue))
                .map_err(|e| PoolError::SpawnError { source: e })?;
            pool.workers.push(handle);
        }

        log::debug!("Started task pool with {workers} workers");
        Ok(pool)
    }

    /// Queue a task. Returns immediately.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.queue.push(Box::new(task)).is_err() {
            log::error!("Task submitted to a stopped pool was dropped");
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue and wait for every worker to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.close();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A task pool worker exited abnormally");
            }
        }
        log::debug!("Task pool stopped");
    }
}

impl fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPool")
            .field("workers", &self.workers.len())
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(queue: &JobQueue<Job>) {
    while let Some(job) = queue.pop() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("A pooled task panicked");
        }
    }
}
