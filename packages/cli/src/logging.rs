//! Global logger: console output through `pretty_env_logger`, plus a copy of
//! every `info`-or-above record from hashvault crates in the current run log.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::env;

use hashvault_operations::RunLog;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

/// Target prefix of records that belong in the run log.
const RUN_LOG_TARGET: &str = "hashvault";

/// Writes to the console and, while one is attached, to a [`RunLog`].
pub struct TeeLogger {
    console: Box<dyn Log>,
    file: Mutex<Option<RunLog>>,
}

impl TeeLogger {
    fn new(console: Box<dyn Log>) -> Self {
        Self {
            console,
            file: Mutex::new(None),
        }
    }

    /// Start copying records into `run_log`. Returns the previously attached log.
    pub fn attach(&self, run_log: RunLog) -> Option<RunLog> {
        self.file.lock().replace(run_log)
    }

    /// Stop copying records to a file and hand back the run log, flushed.
    pub fn detach(&self) -> Option<RunLog> {
        let run_log = self.file.lock().take()?;
        if let Err(e) = run_log.flush() {
            log::warn!("Failed to flush {}: {e}", run_log.path().display());
        }
        Some(run_log)
    }

    /// Append a line to the run log only, bypassing the console.
    pub fn record_in_run_log(&self, level: Level, message: &str) {
        if let Some(run_log) = self.file.lock().as_ref() {
            let _ = run_log.write_line(level, message);
        }
    }

    fn goes_to_file(metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info && metadata.target().starts_with(RUN_LOG_TARGET)
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        Self::goes_to_file(metadata) || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.console.enabled(record.metadata()) {
            self.console.log(record);
        }
        if Self::goes_to_file(record.metadata()) {
            self.record_in_run_log(record.level(), &record.args().to_string());
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(run_log) = self.file.lock().as_ref() {
            let _ = run_log.flush();
        }
    }
}

/// Install the global logger.
///
/// The console shows `warn` and above unless `RUST_LOG` says otherwise;
/// `verbose` forces `debug`.
///
/// # Arguments
///
/// * `verbose` - Whether `--verbose` was passed
pub fn init(verbose: bool) -> &'static TeeLogger {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Warn);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }

    let console = builder.build();
    let max_level = console.filter().max(LevelFilter::Info);

    let logger: &'static TeeLogger = Box::leak(Box::new(TeeLogger::new(Box::new(console))));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(max_level);
    }
    logger
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Silent;

    impl Log for Silent {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            false
        }
        fn log(&self, _: &Record<'_>) {}
        fn flush(&self) {}
    }

    fn emit(logger: &TeeLogger, level: Level, target: &str, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target(target)
                .args(format_args!("{message}"))
                .build(),
        );
    }

    #[test]
    fn test_records_are_copied_while_attached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        let logger = TeeLogger::new(Box::new(Silent));

        emit(&logger, Level::Info, "hashvault_operations", "before attach");
        assert!(logger.attach(RunLog::open(&path).unwrap()).is_none());
        emit(&logger, Level::Info, "hashvault_operations::discover", "Folder path: /a");
        emit(&logger, Level::Error, "hashvault_copy", "copy failed");
        emit(&logger, Level::Debug, "hashvault_copy", "too detailed");
        emit(&logger, Level::Info, "jwalk", "someone else's record");
        assert!(logger.detach().is_some());
        emit(&logger, Level::Info, "hashvault_operations", "after detach");

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[INFO] Folder path: /a\n[ERROR] copy failed\n"
        );
    }

    #[test]
    fn test_record_in_run_log_without_attachment_is_a_no_op() {
        let logger = TeeLogger::new(Box::new(Silent));
        logger.record_in_run_log(Level::Error, "nowhere to go");
        assert!(logger.detach().is_none());
    }
}
