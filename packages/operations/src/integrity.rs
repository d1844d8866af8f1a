//! Post-copy integrity check of the copy store against live source files.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use hashvault_config::{RunPaths, StoreLayout};
use hashvault_record::{FileRecord, modified_secs, read_records};

/// One of the five per-record checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailure {
    /// The source file is gone.
    OriginalMissing,
    /// The store object is gone.
    CopyMissing,
    /// Source and store object differ in size.
    SizeMismatch,
    /// Source size differs from the recorded size.
    RecordedSizeMismatch,
    /// Source modification time differs from the recorded one.
    TimeMismatch,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OriginalMissing => write!(f, "original missing"),
            Self::CopyMissing => write!(f, "copy missing"),
            Self::SizeMismatch => write!(f, "copy size differs"),
            Self::RecordedSizeMismatch => write!(f, "recorded size differs"),
            Self::TimeMismatch => write!(f, "modified time differs"),
        }
    }
}

/// Results of the five checks for one record. `true` means the check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct IntegrityFindings {
    /// See [`CheckFailure::OriginalMissing`].
    pub original_missing: bool,
    /// See [`CheckFailure::CopyMissing`].
    pub copy_missing: bool,
    /// See [`CheckFailure::SizeMismatch`].
    pub size_mismatch: bool,
    /// See [`CheckFailure::RecordedSizeMismatch`].
    pub recorded_size_mismatch: bool,
    /// See [`CheckFailure::TimeMismatch`].
    pub time_mismatch: bool,
}

impl IntegrityFindings {
    /// Every check passed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !(self.original_missing
            || self.copy_missing
            || self.size_mismatch
            || self.recorded_size_mismatch
            || self.time_mismatch)
    }

    /// The failed checks in a fixed order.
    #[must_use]
    pub fn failures(&self) -> Vec<CheckFailure> {
        [
            (self.original_missing, CheckFailure::OriginalMissing),
            (self.copy_missing, CheckFailure::CopyMissing),
            (self.size_mismatch, CheckFailure::SizeMismatch),
            (self.recorded_size_mismatch, CheckFailure::RecordedSizeMismatch),
            (self.time_mismatch, CheckFailure::TimeMismatch),
        ]
        .into_iter()
        .filter_map(|(failed, failure)| failed.then_some(failure))
        .collect()
    }

    /// Compact code: original missing is bit 4 down to time mismatch at bit 0.
    #[must_use]
    pub fn code(&self) -> u8 {
        u8::from(self.original_missing) << 4
            | u8::from(self.copy_missing) << 3
            | u8::from(self.size_mismatch) << 2
            | u8::from(self.recorded_size_mismatch) << 1
            | u8::from(self.time_mismatch)
    }
}

/// A record that failed at least one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    /// Source path.
    pub path: PathBuf,
    /// Recorded digest.
    pub digest: String,
    /// Which checks failed.
    pub findings: IntegrityFindings,
}

/// Outcome of [`check_integrity`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Records with a digest that were checked.
    pub checked: usize,
    /// Records without a digest; they have no store object to check.
    pub unhashed: Vec<PathBuf>,
    /// Records that failed a check.
    pub issues: Vec<IntegrityIssue>,
    /// Store objects deleted as stale.
    pub removed: Vec<String>,
    /// Stale store objects kept because a clean record or another run still
    /// references the digest.
    pub retained: Vec<String>,
}

impl IntegrityReport {
    /// No record failed a check.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run the five checks for one record.
#[must_use]
pub fn inspect(record: &FileRecord, layout: &StoreLayout) -> IntegrityFindings {
    let original = fs::metadata(&record.path).ok();
    let copy = fs::metadata(layout.object_path(&record.digest)).ok();

    let mut findings = IntegrityFindings {
        original_missing: original.is_none(),
        copy_missing: copy.is_none(),
        ..IntegrityFindings::default()
    };

    if let Some(original) = &original {
        findings.recorded_size_mismatch = original.len() != record.size;
        findings.time_mismatch = modified_secs(original) != record.modified;
        if let Some(copy) = &copy {
            findings.size_mismatch = original.len() != copy.len();
        }
    }

    findings
}

/// Digests recorded by every run under `data_dir` other than `current`.
///
/// The copy store is shared by all runs, so these objects must survive a
/// failed check in the current run. Runs without a readable
/// `file_info.json` contribute nothing.
#[must_use]
pub fn referenced_digests(data_dir: &Path, current: &Path) -> HashSet<String> {
    let mut digests = HashSet::new();
    let entries = match fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list runs in {}: {e}", data_dir.display());
            return digests;
        }
    };

    for dir in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        if dir == current || !dir.is_dir() {
            continue;
        }
        let file_info = RunPaths::in_dir(&dir).file_info;
        if !file_info.is_file() {
            continue;
        }
        match read_records(&file_info) {
            Ok(records) => digests.extend(
                records
                    .into_iter()
                    .filter(|record| record.has_digest())
                    .map(|record| record.digest),
            ),
            Err(e) => log::warn!("{e}"),
        }
    }

    digests
}

/// Check every hashed record against the live source and the copy store.
///
/// A store object whose record failed a check is deleted, unless a record
/// that passed every check carries the same digest or the digest is in
/// `other_runs` (see [`referenced_digests`]). Deletion failures are logged.
#[must_use]
pub fn check_integrity(
    records: &[FileRecord],
    layout: &StoreLayout,
    other_runs: &HashSet<String>,
) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    let mut verified: HashSet<&str> = HashSet::new();
    let mut stale: BTreeSet<&str> = BTreeSet::new();

    for record in records {
        if !record.has_digest() {
            log::warn!("Not backed up (no digest): {}", record.path.display());
            report.unhashed.push(record.path.clone());
            continue;
        }

        report.checked += 1;
        let findings = inspect(record, layout);

        if findings.is_clean() {
            verified.insert(record.digest.as_str());
            continue;
        }

        let reasons: Vec<String> = findings.failures().iter().map(ToString::to_string).collect();
        log::error!(
            "Check: File {} is different from backup, error code: {} ({})",
            record.path.display(),
            findings.code(),
            reasons.join(", ")
        );

        if !findings.copy_missing {
            stale.insert(record.digest.as_str());
        }

        report.issues.push(IntegrityIssue {
            path: record.path.clone(),
            digest: record.digest.clone(),
            findings,
        });
    }

    for digest in stale {
        if verified.contains(digest) {
            log::info!("Keeping {digest}: still referenced by a verified file");
            report.retained.push(digest.to_string());
            continue;
        }
        if other_runs.contains(digest) {
            log::info!("Keeping {digest}: still referenced by an earlier run");
            report.retained.push(digest.to_string());
            continue;
        }

        let object = layout.object_path(digest);
        match fs::remove_file(&object) {
            Ok(()) => {
                log::info!("Removed stale copy {}", object.display());
                report.removed.push(digest.to_string());
            }
            Err(e) => log::error!("Failed to remove stale copy {}: {e}", object.display()),
        }
    }

    log::info!(
        "Checked {} files: {} issue(s), {} stale cop(ies) removed",
        report.checked,
        report.issues.len(),
        report.removed.len()
    );

    report
}
