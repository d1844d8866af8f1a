//! hashvault CLI entry point.
//!
//! Backs directories up into a content-addressed copy store, where every
//! unique file content is kept once, and restores them from it.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod args;
mod interactive;
mod logging;
mod output;
mod progress;

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use log::Level;

use args::{Args, BackupArgs, Command, RestoreArgs};
use hashvault_config::{RunPaths, Settings};
use hashvault_copy::ProgressSink;
use hashvault_operations::{
    BackupLocation, BackupRequest, OperationError, RestoreRequest, RunLog, absolutize, discover,
    finalize_run, locate_backup, parse_backup_roots, prepare_run, restore_target, run_backup,
    run_restore,
};
use logging::TeeLogger;
use progress::TerminalProgress;

/// Timestamp format of run directory and restore log names.
const STAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

fn main() {
    let args = Args::parse();
    let logger = logging::init(args.verbose);

    if let Err(e) = run(&args, logger) {
        logger.record_in_run_log(Level::Error, &e.to_string());
        logger.detach();
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(args: &Args, logger: &TeeLogger) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = env::current_dir()?;
    let settings = Settings::load(args.config.as_deref(), &cwd)?;
    let sink: Arc<dyn ProgressSink> = Arc::new(TerminalProgress::new(args.should_show_progress()));

    match &args.command {
        Command::Backup(backup) => run_backup_command(args, backup, &settings, logger, sink),
        Command::Restore(restore) => {
            run_restore_command(args, restore, &settings, &cwd, logger, sink)
        }
    }
}

fn stamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

fn run_backup_command(
    args: &Args,
    backup: &BackupArgs,
    settings: &Settings,
    logger: &TeeLogger,
    sink: Arc<dyn ProgressSink>,
) -> Result<(), Box<dyn std::error::Error>> {
    output::print_header("hashvault backup");

    let mut sources = backup.folders.clone();
    if !args.non_interactive {
        sources.extend(interactive::prompt_more_sources()?);
    }
    if sources.is_empty() {
        return Err(OperationError::NoSources.into());
    }

    let layout = settings.layout();
    let stamp = stamp();
    let run = prepare_run(&layout, &stamp)?;
    logger.attach(RunLog::open(&run.log)?);

    let threads = backup.thread_count(settings);
    let cache_mode = backup.cache_mode();
    log::info!("Project started");
    log::info!("Called time: {stamp}");
    log::info!("Thread number: {threads}, cache mode: {cache_mode:?}");

    output::print_step("Searching directories and files...");
    let tree = discover(&sources, &settings.ignore_set()?);
    if tree.roots.is_empty() {
        logger.detach();
        remove_abandoned_run(&run);
        return Err(OperationError::NoSources.into());
    }
    output::print_done(&format!(
        "Found {} directories and {} files under {} root(s)",
        tree.directories.len(),
        tree.files.len(),
        tree.roots.len()
    ));

    if !args.non_interactive && !interactive::confirm_continue("Start the backup?")? {
        log::info!("Backup cancelled before hashing");
        logger.detach();
        remove_abandoned_run(&run);
        output::print_warning("Backup cancelled");
        return Ok(());
    }

    let roots = tree.roots.clone();
    let summary = run_backup(
        BackupRequest {
            tree,
            layout,
            run: run.clone(),
            threads,
            cache_mode,
            pretty_json: settings.pretty_json,
            show_progress: args.should_show_progress(),
        },
        sink,
    )
    .inspect_err(|_| {
        output::print_warning(&format!(
            "Incomplete run kept for inspection: {}",
            run.dir.display()
        ));
    })?;
    output::print_backup_summary(&summary);

    log::info!("Backup finished");
    logger.detach();
    let final_dir = finalize_run(&run, &stamp, &roots)?;

    println!();
    output::print_done("Backup complete");
    output::print_path("Run", &final_dir);
    Ok(())
}

fn remove_abandoned_run(run: &RunPaths) {
    if let Err(e) = fs::remove_dir_all(&run.dir) {
        log::warn!("Failed to remove {}: {e}", run.dir.display());
    }
}

fn run_restore_command(
    args: &Args,
    restore: &RestoreArgs,
    settings: &Settings,
    cwd: &Path,
    logger: &TeeLogger,
    sink: Arc<dyn ProgressSink>,
) -> Result<(), Box<dyn std::error::Error>> {
    output::print_header("hashvault restore");

    let output_dir = absolutize(&restore.output, cwd);
    let stamp = stamp();
    logger.attach(RunLog::open(
        &output_dir.join(format!("{stamp}_restore_log.txt")),
    )?);
    log::info!("Restore started");
    log::info!("Called time: {stamp}");

    let layout = settings.layout();
    let backup_dir = match locate_backup(&layout.data_dir, &restore.input)? {
        BackupLocation::Exact(dir) => dir,
        BackupLocation::Ranked(candidates) => {
            let index = if args.non_interactive {
                0
            } else {
                interactive::choose_backup(&candidates)?
            };
            let chosen = &candidates[index];
            log::info!(
                "Using closest backup {} ({:.1}% similar to {:?})",
                chosen.name,
                chosen.score * 100.0,
                restore.input
            );
            chosen.path.clone()
        }
    };
    log::info!("Backup folder: {}", backup_dir.display());

    let roots = parse_backup_roots(&RunPaths::in_dir(&backup_dir).log)?;
    output::print_path("Backup", &backup_dir);
    output::print_path("Output", &output_dir);
    for root in &roots {
        if let Some(target) = restore_target(root, &roots, &output_dir) {
            output::print_root_mapping(root, &target);
        }
    }
    if restore.overwrite {
        output::print_warning("Existing files in the output will be replaced");
    }

    if !args.non_interactive && !interactive::confirm_continue("Start the restore?")? {
        log::info!("Restore cancelled before copying");
        logger.detach();
        output::print_warning("Restore cancelled");
        return Ok(());
    }

    let summary = run_restore(
        &RestoreRequest {
            backup_dir,
            roots,
            output: output_dir,
            layout,
            overwrite: restore.overwrite,
            show_progress: args.should_show_progress(),
        },
        sink,
    )?;
    output::print_restore_summary(&summary);

    log::info!("Restore finished");
    logger.detach();

    println!();
    output::print_done("Restore complete");
    Ok(())
}
