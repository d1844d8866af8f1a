//! Deduplicating file copying with progress tracking.
//!
//! This crate provides:
//!
//! * [`CopyEngine`], a single background worker draining a queue of
//!   [`CopyTask`]s; an existing destination is skipped or replaced per
//!   [`OverwritePolicy`]
//! * [`ProgressAggregator`], paired file and byte counters rendered through a
//!   [`ProgressSink`]
//! * Copy-on-write support via `reflink-copy` (APFS, Btrfs, `ReFS`)
//!
//! # Example
//!
//! ```rust,ignore
//! use hashvault_copy::{CopyEngine, CopyTask, OverwritePolicy};
//!
//! let engine = CopyEngine::start(OverwritePolicy::Skip, sink)?;
//! let queue = engine.handle();
//! queue.enqueue(CopyTask { source, destination, size })?;
//! engine.show_progress();
//! let report = engine.finish();
//! println!("{} copied, {} already stored", report.copied, report.skipped_existing);
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod copy;
mod engine;
mod error;
mod progress;

pub use copy::{CopyOutcome, OverwritePolicy, place_file};
pub use engine::{CopyEngine, CopyQueueHandle, CopyReport, CopyTask, EngineState};
pub use error::CopyError;
pub use progress::{
    Dimension, NullSink, ProgressAggregator, ProgressCounter, ProgressSink, ProgressSnapshot,
    ProgressView,
};
