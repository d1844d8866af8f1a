//! Interactive prompts using dialoguer.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::io;
use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use hashvault_operations::BackupCandidate;

/// Line that ends source path entry.
pub const END_OF_SOURCES: &str = "$END";

/// Candidates shown before "More...".
const SHORTLIST_LEN: usize = 5;

/// Ask for more source directories, one per line, until [`END_OF_SOURCES`].
///
/// Blank lines are ignored.
///
/// # Errors
///
/// * If the user cancels the input
pub fn prompt_more_sources() -> io::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    loop {
        let line: String = Input::new()
            .with_prompt(format!("Source directory ({END_OF_SOURCES} to finish)"))
            .allow_empty(true)
            .interact_text()?;

        let line = line.trim();
        if line == END_OF_SOURCES {
            return Ok(sources);
        }
        if !line.is_empty() {
            sources.push(PathBuf::from(line));
        }
    }
}

/// Ask whether to go on.
///
/// # Errors
///
/// * If the user cancels the prompt
pub fn confirm_continue(prompt: &str) -> io::Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?)
}

fn describe(candidate: &BackupCandidate) -> String {
    format!("{:5.1}%  {}", candidate.score * 100.0, candidate.name)
}

/// Let the user pick one of the ranked backups. Returns its index.
///
/// The best few are listed first; "More..." opens the full list.
///
/// # Arguments
///
/// * `candidates` - Ranked best first, not empty
///
/// # Errors
///
/// * If the user cancels the selection
pub fn choose_backup(candidates: &[BackupCandidate]) -> io::Result<usize> {
    let mut items: Vec<String> = candidates
        .iter()
        .take(SHORTLIST_LEN)
        .map(describe)
        .collect();
    let has_more = candidates.len() > SHORTLIST_LEN;
    if has_more {
        items.push("More...".to_string());
    }

    let choice = Select::new()
        .with_prompt("Backup not found. Choose one of the closest matches")
        .items(&items)
        .default(0)
        .interact()?;

    if !(has_more && choice == SHORTLIST_LEN) {
        return Ok(choice);
    }

    let all: Vec<String> = candidates.iter().map(describe).collect();
    Ok(Select::new()
        .with_prompt("Choose a backup")
        .items(&all)
        .default(0)
        .interact()?)
}
