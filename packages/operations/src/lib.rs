//! Backup and restore runs for hashvault.
//!
//! This crate ties the lower layers together:
//!
//! * [`discover`] walks the source roots
//! * [`run_backup`] hashes every file on a worker pool, deduplicates copies
//!   into the content-addressed store, writes the run metadata and checks
//!   integrity
//! * [`check_integrity`] compares records against live files and the store
//! * [`locate_backup`] and [`run_restore`] find a run and copy it back out
//! * [`RunLog`] is the per-run text log restore reads roots from
//!
//! # Example
//!
//! ```rust,ignore
//! use hashvault_operations::{BackupRequest, discover, prepare_run, run_backup};
//!
//! let run = prepare_run(&layout, "2024_05_01_10_00_00")?;
//! let tree = discover(&roots, &settings.ignore_set()?);
//! let summary = run_backup(
//!     BackupRequest { tree, layout, run, threads: 8, cache_mode, pretty_json: false, show_progress: true },
//!     sink,
//! )?;
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod backup;
mod discover;
mod error;
mod integrity;
mod restore;
mod run_log;
mod similarity;

pub use backup::{
    BackupRequest, BackupSummary, MAX_NAMED_ROOTS, finalize_run, prepare_run, run_backup,
    run_dir_name,
};
pub use discover::{SourceTree, absolutize, discover};
pub use error::OperationError;
pub use integrity::{
    CheckFailure, IntegrityFindings, IntegrityIssue, IntegrityReport, check_integrity, inspect,
    referenced_digests,
};
pub use restore::{RestoreRequest, RestoreSummary, parse_backup_roots, restore_target, run_restore};
pub use run_log::{ROOT_MARKER, RunLog, parse_root_line};
pub use similarity::{
    BackupCandidate, BackupLocation, jaro_similarity, levenshtein_similarity, locate_backup,
    rank_backups,
};
