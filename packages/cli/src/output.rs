//! Terminal output formatting.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::Path;

use colored::Colorize;
use hashvault_operations::{BackupSummary, RestoreSummary};

/// Print a header message.
pub fn print_header(message: &str) {
    println!("\n{} {}\n", "🗄", message.bold());
}

/// Print a stage that is starting.
pub fn print_step(message: &str) {
    println!("{} {}", "•".dimmed(), message);
}

/// Print a finished stage.
pub fn print_done(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print a labelled path.
pub fn print_path(label: &str, path: &Path) {
    println!("  {:<12} {}", label, path.display().to_string().cyan());
}

/// Print how a backed-up root maps into the restore output.
pub fn print_root_mapping(root: &Path, target: &Path) {
    println!(
        "  {} {} {}",
        root.display().to_string().yellow(),
        "→".dimmed(),
        target.display().to_string().cyan()
    );
}

fn count_line(label: &str, count: u64, bad: bool) {
    let value = count.to_string();
    let value = if bad && count > 0 {
        value.red().bold()
    } else {
        value.normal()
    };
    println!("  {label:<22} {value}");
}

/// Print the counts of a finished backup.
pub fn print_backup_summary(summary: &BackupSummary) {
    println!();
    println!("{}", "Backup summary".bold());
    count_line("Directories", summary.directories as u64, false);
    count_line("Files found", summary.files_found as u64, false);
    println!("  {:<22} {}", "Bytes", summary.bytes_total);
    count_line("Hashed", summary.hashed as u64, false);
    count_line("Failed", summary.failed as u64, true);
    count_line("Copied", summary.copy.copied, false);
    count_line("Deduplicated", summary.copy.skipped_existing, false);
    count_line("Copy failures", summary.copy.failed, true);
    count_line("Integrity failures", summary.integrity.issues.len() as u64, true);
    count_line("Stale copies removed", summary.integrity.removed.len() as u64, true);
}

/// Print the counts of a finished restore.
pub fn print_restore_summary(summary: &RestoreSummary) {
    println!();
    println!("{}", "Restore summary".bold());
    count_line("Directories created", summary.directories_created as u64, false);
    count_line("Directories existing", summary.directories_existing as u64, false);
    count_line("Directory failures", summary.directories_failed as u64, true);
    count_line("Files restored", summary.copy.copied + summary.copy.replaced, false);
    count_line("Files kept", summary.copy.skipped_existing, false);
    count_line("Copy failures", summary.copy.failed, true);
    count_line("Corrupted records", summary.corrupted as u64, true);
    count_line("Lost copies", summary.lost as u64, true);
}

/// Print error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}
