//! Progress tracking shared between worker threads and a renderer.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One tracked dimension: `current` out of `total`.
///
/// Both values are atomics. The total may still grow while workers advance
/// `current`, so [`ratio`](Self::ratio) clamps to `[0, 1]`.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    current: AtomicU64,
    total: AtomicU64,
}

impl ProgressCounter {
    /// Create a counter with a known total.
    #[must_use]
    pub const fn new(total: u64) -> Self {
        Self {
            current: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    /// Add `delta` to the current value and return the new value.
    pub fn accumulate(&self, delta: u64) -> u64 {
        self.current.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Set the current value.
    pub fn update(&self, absolute: u64) {
        self.current.store(absolute, Ordering::SeqCst);
    }

    /// Grow the total.
    pub fn add_total(&self, delta: u64) {
        self.total.fetch_add(delta, Ordering::SeqCst);
    }

    /// Shrink the total, saturating at zero.
    pub fn retract_total(&self, delta: u64) {
        let _ = self
            .total
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_sub(delta))
            });
    }

    /// Current value.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Total value.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Completion ratio in `[0, 1]`. An empty total counts as complete.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        (self.current() as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Which counter an update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Number of files.
    Files,
    /// Number of bytes.
    Bytes,
}

/// What a renderer is asked to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressView {
    /// One ratio.
    Single(f64),
    /// Files and bytes ratios read together.
    Dual {
        /// Ratio of finished files.
        files: f64,
        /// Ratio of finished bytes.
        bytes: f64,
    },
}

/// Receives progress views. Called inline from worker threads, so
/// implementations must return quickly.
pub trait ProgressSink: Send + Sync {
    /// Draw the current state.
    fn render(&self, view: ProgressView);

    /// The tracked operation is over.
    fn finish(&self) {}
}

/// Sink that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn render(&self, _view: ProgressView) {}
}

/// Point-in-time copy of both counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// Files finished.
    pub files_done: u64,
    /// Files known so far.
    pub files_total: u64,
    /// Bytes finished.
    pub bytes_done: u64,
    /// Bytes known so far.
    pub bytes_total: u64,
}

impl ProgressSnapshot {
    /// Calculate file progress as a percentage (0.0 to 100.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.files_total == 0 {
            100.0
        } else {
            (self.files_done as f64 / self.files_total as f64 * 100.0).min(100.0)
        }
    }
}

/// A files counter and a bytes counter, optionally bound into one dual view.
///
/// Rendering is off until [`enable_display`](Self::enable_display) is called.
/// Every update renders inline when display is on.
pub struct ProgressAggregator {
    files: ProgressCounter,
    bytes: ProgressCounter,
    paired: bool,
    display: AtomicBool,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("files", &self.files)
            .field("bytes", &self.bytes)
            .field("paired", &self.paired)
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

impl ProgressAggregator {
    /// Files and bytes rendered together as [`ProgressView::Dual`].
    #[must_use]
    pub fn paired(sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_binding(sink, true)
    }

    /// Only the files counter is rendered, as [`ProgressView::Single`].
    #[must_use]
    pub fn single(sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_binding(sink, false)
    }

    fn with_binding(sink: Arc<dyn ProgressSink>, paired: bool) -> Self {
        Self {
            files: ProgressCounter::default(),
            bytes: ProgressCounter::default(),
            paired,
            display: AtomicBool::new(false),
            sink,
        }
    }

    fn counter(&self, dimension: Dimension) -> &ProgressCounter {
        match dimension {
            Dimension::Files => &self.files,
            Dimension::Bytes => &self.bytes,
        }
    }

    /// Grow a total. Does not render.
    pub fn add_total(&self, dimension: Dimension, delta: u64) {
        self.counter(dimension).add_total(delta);
    }

    /// Shrink a total. Does not render.
    pub fn retract_total(&self, dimension: Dimension, delta: u64) {
        self.counter(dimension).retract_total(delta);
    }

    /// Add to one counter and render.
    pub fn accumulate(&self, dimension: Dimension, delta: u64) {
        self.counter(dimension).accumulate(delta);
        self.render();
    }

    /// Set one counter and render.
    pub fn update(&self, dimension: Dimension, absolute: u64) {
        self.counter(dimension).update(absolute);
        self.render();
    }

    /// Add to both counters and render once.
    pub fn advance(&self, files: u64, bytes: u64) {
        self.files.accumulate(files);
        self.bytes.accumulate(bytes);
        self.render();
    }

    /// Start rendering on updates and draw the current state.
    pub fn enable_display(&self) {
        self.display.store(true, Ordering::SeqCst);
        self.render();
    }

    /// Whether updates are rendered.
    #[must_use]
    pub fn is_displaying(&self) -> bool {
        self.display.load(Ordering::SeqCst)
    }

    /// The view a sink would receive now.
    #[must_use]
    pub fn view(&self) -> ProgressView {
        if self.paired {
            ProgressView::Dual {
                files: self.files.ratio(),
                bytes: self.bytes.ratio(),
            }
        } else {
            ProgressView::Single(self.files.ratio())
        }
    }

    /// Read both counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_done: self.files.current(),
            files_total: self.files.total(),
            bytes_done: self.bytes.current(),
            bytes_total: self.bytes.total(),
        }
    }

    /// Draw a final frame and tell the sink the operation is over.
    pub fn finish(&self) {
        if self.display.swap(false, Ordering::SeqCst) {
            self.sink.render(self.view());
            self.sink.finish();
        }
    }

    fn render(&self) {
        if self.is_displaying() {
            self.sink.render(self.view());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Sink that records every view it is given.
    #[derive(Default)]
    pub struct RecordingSink {
        pub views: Mutex<Vec<ProgressView>>,
        pub finished: AtomicBool,
    }

    impl ProgressSink for RecordingSink {
        fn render(&self, view: ProgressView) {
            self.views.lock().push(view);
        }

        fn finish(&self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_counter_ratio_clamps() {
        let counter = ProgressCounter::new(4);
        assert!((counter.ratio() - 0.0).abs() < f64::EPSILON);

        counter.accumulate(2);
        assert!((counter.ratio() - 0.5).abs() < f64::EPSILON);

        counter.update(9);
        assert!((counter.ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_total_is_complete() {
        let counter = ProgressCounter::new(0);
        assert!((counter.ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retract_total_saturates() {
        let counter = ProgressCounter::new(3);
        counter.retract_total(5);
        assert_eq!(counter.total(), 0);
    }

    #[test]
    fn test_no_render_until_display_enabled() {
        let sink = Arc::new(RecordingSink::default());
        let aggregator = ProgressAggregator::paired(sink.clone());
        aggregator.add_total(Dimension::Files, 2);
        aggregator.add_total(Dimension::Bytes, 10);

        aggregator.advance(1, 5);
        assert!(sink.views.lock().is_empty());

        aggregator.enable_display();
        aggregator.advance(1, 5);

        let views = sink.views.lock();
        assert_eq!(views.len(), 2);
        assert_eq!(
            views[0],
            ProgressView::Dual {
                files: 0.5,
                bytes: 0.5
            }
        );
        assert_eq!(
            views[1],
            ProgressView::Dual {
                files: 1.0,
                bytes: 1.0
            }
        );
    }

    #[test]
    fn test_single_binding_renders_files_only() {
        let sink = Arc::new(RecordingSink::default());
        let aggregator = ProgressAggregator::single(sink.clone());
        aggregator.add_total(Dimension::Files, 4);
        aggregator.enable_display();

        aggregator.accumulate(Dimension::Files, 1);
        aggregator.accumulate(Dimension::Bytes, 100);

        let views = sink.views.lock();
        assert_eq!(views.last(), Some(&ProgressView::Single(0.25)));
    }

    #[test]
    fn test_finish_renders_once_and_notifies() {
        let sink = Arc::new(RecordingSink::default());
        let aggregator = ProgressAggregator::single(sink.clone());
        aggregator.enable_display();
        aggregator.finish();
        aggregator.finish();

        assert!(sink.finished.load(Ordering::SeqCst));
        assert_eq!(sink.views.lock().len(), 2);
        assert!(!aggregator.is_displaying());
    }

    #[test]
    fn test_snapshot_percentage() {
        let aggregator = ProgressAggregator::paired(Arc::new(NullSink));
        aggregator.add_total(Dimension::Files, 8);
        aggregator.advance(2, 0);

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.files_done, 2);
        assert_eq!(snapshot.files_total, 8);
        assert!((snapshot.percentage() - 25.0).abs() < f64::EPSILON);
    }
}
