//! Terminal progress rendering for the hashing and copy stages.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use colored::{ColoredString, Colorize};
use hashvault_copy::{Dimension, ProgressSink, ProgressView};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

/// Width of the drawn bar in blocks.
pub const BLOCK_COUNT: usize = 50;

const FILES_COLOR: (u8, u8, u8) = (200, 100, 100);
const BYTES_COLOR: (u8, u8, u8) = (100, 100, 200);
const BOTH_COLOR: (u8, u8, u8) = (150, 75, 150);

/// How the blocks of a two-ratio bar are shared out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocks {
    /// Blocks both ratios have reached.
    pub both: usize,
    /// Blocks only the leading ratio has reached.
    pub lead: usize,
    /// Blocks neither has reached.
    pub rest: usize,
    /// Which ratio is ahead. Files when tied.
    pub leader: Dimension,
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn filled(ratio: f64) -> usize {
    (ratio.clamp(0.0, 1.0) * BLOCK_COUNT as f64).round() as usize
}

/// Split [`BLOCK_COUNT`] blocks between the files and bytes ratios.
#[must_use]
pub fn split_blocks(files: f64, bytes: f64) -> Blocks {
    let files = filled(files);
    let bytes = filled(bytes);
    Blocks {
        both: files.min(bytes),
        lead: files.abs_diff(bytes),
        rest: BLOCK_COUNT - files.max(bytes),
        leader: if files >= bytes {
            Dimension::Files
        } else {
            Dimension::Bytes
        },
    }
}

fn paint(count: usize, (r, g, b): (u8, u8, u8)) -> ColoredString {
    "#".repeat(count).as_str().truecolor(r, g, b)
}

/// The bar and percentage text for one view.
#[must_use]
pub fn compose(view: ProgressView) -> String {
    match view {
        ProgressView::Single(ratio) => {
            let done = filled(ratio);
            format!(
                "[{}{}] {:5.1}%",
                paint(done, FILES_COLOR),
                "-".repeat(BLOCK_COUNT - done).dimmed(),
                ratio * 100.0
            )
        }
        ProgressView::Dual { files, bytes } => {
            let blocks = split_blocks(files, bytes);
            let lead_color = match blocks.leader {
                Dimension::Files => FILES_COLOR,
                Dimension::Bytes => BYTES_COLOR,
            };
            format!(
                "[{}{}{}] {:5.1}% files, {:5.1}% bytes",
                paint(blocks.both, BOTH_COLOR),
                paint(blocks.lead, lead_color),
                "-".repeat(blocks.rest).dimmed(),
                files * 100.0,
                bytes * 100.0
            )
        }
    }
}

/// [`ProgressSink`] drawing an indicatif bar on stderr.
///
/// A bar is created on the first render after construction or after
/// [`ProgressSink::finish`], so one sink can serve several stages.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl TerminalProgress {
    /// Create a sink. A disabled sink draws nothing.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            enabled,
        }
    }

    fn create_bar() -> ProgressBar {
        let pb = ProgressBar::new(BLOCK_COUNT as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} {elapsed_precise}")
                .expect("Invalid progress bar template"),
        );
        pb
    }
}

impl ProgressSink for TerminalProgress {
    fn render(&self, view: ProgressView) {
        if !self.enabled {
            return;
        }
        let mut bar = self.bar.lock();
        bar.get_or_insert_with(Self::create_bar)
            .set_message(compose(view));
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish();
        }
    }
}
