//! CLI argument definitions.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hashvault_config::Settings;
use hashvault_digest::CacheMode;

/// CLI arguments for hashvault.
#[derive(Debug, Parser)]
#[command(
    name = "hashvault",
    about = "Content-addressed, deduplicating backup and restore",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file to use instead of the discovered one.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run without prompts or confirmation pauses.
    #[arg(long, visible_alias = "yes", global = true)]
    pub non_interactive: bool,

    /// Disable progress bars (useful for CI environments).
    #[arg(long = "no-progress", global = true)]
    pub no_progress: bool,

    /// Enable verbose output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Back up one or more directories into the copy store.
    Backup(BackupArgs),
    /// Restore a backup run into a directory.
    Restore(RestoreArgs),
}

#[derive(Debug, clap::Args)]
pub struct BackupArgs {
    /// Directories to back up.
    #[arg(long = "folders", short = 'f', num_args = 1..)]
    pub folders: Vec<PathBuf>,

    /// Number of hashing threads.
    #[arg(long, short = 'j')]
    pub threads: Option<usize>,

    /// Reuse cached digests for files whose path, size and time are unchanged.
    #[arg(long = "check-cached", short = 'c')]
    pub check_cached: bool,

    /// Rehash cached files and fail if any cached digest is wrong.
    #[arg(long = "verify-cached")]
    pub verify_cached: bool,
}

#[derive(Debug, clap::Args)]
pub struct RestoreArgs {
    /// Backup run name, or something close to it.
    #[arg(long = "input-folder", short = 'i')]
    pub input: String,

    /// Directory to restore into.
    #[arg(long = "output-folder", short = 'o')]
    pub output: PathBuf,

    /// Replace files that already exist in the output directory.
    #[arg(long)]
    pub overwrite: bool,
}

impl Args {
    /// Determine if we should show progress bars.
    #[must_use]
    pub const fn should_show_progress(&self) -> bool {
        !self.no_progress
    }
}

impl BackupArgs {
    /// How the digest cache is used. `--verify-cached` wins over `--check-cached`.
    #[must_use]
    pub const fn cache_mode(&self) -> CacheMode {
        if self.verify_cached {
            CacheMode::Verify
        } else if self.check_cached {
            CacheMode::Trust
        } else {
            CacheMode::Disabled
        }
    }

    /// Worker count: the flag, then the settings file, then one per CPU.
    #[must_use]
    pub fn thread_count(&self, settings: &Settings) -> usize {
        self.threads
            .or(settings.threads)
            .unwrap_or_else(num_cpus::get)
            .max(1)
    }
}
