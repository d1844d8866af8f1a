//! Fuzzy lookup of backup run directories by name.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use hashvault_config::RunPaths;

use crate::error::OperationError;

/// A run directory and how closely its name matches the query.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupCandidate {
    /// Run directory.
    pub path: PathBuf,
    /// Directory name.
    pub name: String,
    /// Normalized Levenshtein similarity in `[0, 1]`.
    pub score: f64,
    /// Jaro similarity, used to order equal scores.
    pub tiebreak: f64,
}

impl BackupCandidate {
    /// Compare by rank: better candidates sort first.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.tiebreak.total_cmp(&self.tiebreak))
    }
}

/// `1 - distance / max_len` over characters. Two empty strings are identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j]
            } else {
                1 + previous[j].min(previous[j + 1]).min(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    1.0 - previous[b.len()] as f64 / longest as f64
}

/// Jaro similarity in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaro_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0_usize;

    for (i, ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0_usize;
    let mut b_matches = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    for (ca, _) in a.iter().zip(&a_matched).filter(|(_, m)| **m) {
        if b_matches.next() != Some(ca) {
            transpositions += 1;
        }
    }

    let m = matches as f64;
    let t = transpositions as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Whether `dir` holds a finished run, i.e. one with a `file_info.json`.
fn is_complete_run(dir: &Path) -> bool {
    RunPaths::in_dir(dir).file_info.is_file()
}

/// Rank every finished run directory under `data_dir` by name similarity to
/// `query`.
///
/// Best match first. Equal scores fall back to Jaro similarity, then name.
/// Directories left by aborted runs have no `file_info.json` and are skipped.
///
/// # Errors
///
/// * If `data_dir` cannot be read
pub fn rank_backups(data_dir: &Path, query: &str) -> Result<Vec<BackupCandidate>, OperationError> {
    let entries = fs::read_dir(data_dir).map_err(|e| OperationError::IoError {
        path: data_dir.to_path_buf(),
        source: e,
    })?;

    let mut candidates: Vec<BackupCandidate> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| {
            let complete = is_complete_run(&entry.path());
            if !complete {
                log::debug!("Skipping incomplete run {}", entry.path().display());
            }
            complete
        })
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            BackupCandidate {
                path: entry.path(),
                score: levenshtein_similarity(query, &name),
                tiebreak: jaro_similarity(query, &name),
                name,
            }
        })
        .collect();

    candidates.sort_by(|x, y| x.rank_cmp(y).then_with(|| x.name.cmp(&y.name)));

    log::debug!(
        "Ranked {} backups against {query:?}, best: {:?}",
        candidates.len(),
        candidates.first().map(|c| &c.name)
    );

    Ok(candidates)
}

/// Where a requested backup name points.
#[derive(Debug, Clone, PartialEq)]
pub enum BackupLocation {
    /// `<data_dir>/<name>` exists.
    Exact(PathBuf),
    /// No exact match; candidates ranked best first, never empty.
    Ranked(Vec<BackupCandidate>),
}

/// Resolve a finished backup run by name, falling back to similarity ranking.
///
/// # Errors
///
/// * If there is no exact match and `data_dir` cannot be read
/// * [`OperationError::NoBackups`] if there is no exact match and no run
///   directories at all
pub fn locate_backup(data_dir: &Path, name: &str) -> Result<BackupLocation, OperationError> {
    let exact = data_dir.join(name);
    if !name.is_empty() && is_complete_run(&exact) {
        return Ok(BackupLocation::Exact(exact));
    }

    log::info!("Backup {name:?} not found, searching for similar names");
    let candidates = rank_backups(data_dir, name)?;
    if candidates.is_empty() {
        return Err(OperationError::NoBackups {
            data_dir: data_dir.to_path_buf(),
        });
    }
    Ok(BackupLocation::Ranked(candidates))
}
