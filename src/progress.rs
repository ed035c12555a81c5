//! Progress reporting.
//!
//! This module provides [`ProgressCallback`] for observing long-running work
//! and [`ProgressInfo`] for the snapshots delivered to it. Only three things
//! in `framepick` take long enough to be worth reporting: downloading a remote
//! video, scanning a container for its frame count, and packing the output
//! directory into an archive.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepick::{ProgressCallback, ProgressInfo, SessionOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(fraction) = info.fraction {
//!             println!("[{:?}] {:.1}%", info.operation, fraction * 100.0);
//!         }
//!     }
//! }
//!
//! let options = SessionOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Transferring a remote video to a local file. Units are bytes.
    Download,
    /// Counting frames in a container that does not report them. Units are
    /// packets.
    FrameScan,
    /// Writing saved frames into an archive. Units are files.
    ArchiveBuild,
}

/// A snapshot of progress for one operation.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// Units processed so far.
    pub current: u64,
    /// Total units expected, if known.
    pub total: Option<u64>,
    /// Completed fraction in `[0.0, 1.0]`, if `total` is known.
    pub fraction: Option<f64>,
    /// Wall-clock time since the operation started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`].
///
/// Callbacks only observe. Nothing in `framepick` can be cancelled through
/// them.
pub trait ProgressCallback: Send + Sync {
    /// Called whenever the operation advances.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Default when nothing is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Compute `current / total`, clamped into `[0.0, 1.0]`.
///
/// Returns `None` when the total is unknown or zero.
pub fn progress_fraction(current: u64, total: Option<u64>) -> Option<f64> {
    total
        .filter(|&total| total > 0)
        .map(|total| (current as f64 / total as f64).clamp(0.0, 1.0))
}

/// Internal helper that tracks timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item and fire the callback if the batch
    /// threshold is reached.
    pub(crate) fn advance(&mut self) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report();
            self.items_since_last_report = 0;
        }
    }

    /// Jump to an absolute position, e.g. a byte count read from the
    /// downloader. The total may change as estimates improve.
    pub(crate) fn update(&mut self, current: u64, total: Option<u64>) {
        self.current = current;
        if total.is_some() {
            self.total = total;
        }
        self.report();
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            fraction: progress_fraction(self.current, self.total),
            elapsed: self.start_time.elapsed(),
        };

        self.callback.on_progress(&info);
    }
}
