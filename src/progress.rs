//! Progress-callback trait for batch conversion events.
//!
//! Pass an [`Arc<dyn BatchProgressCallback>`] to
//! [`crate::convert::run_batch_with_progress`] to receive real-time events
//! as the orchestrator works through the queue.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a UI event loop, a broadcast channel, or a terminal
//! progress bar without the library knowing how the host application
//! communicates. The trait is `Send + Sync` because strategies report
//! per-page progress from blocking worker threads.
//!
//! Inside the engine, strategies see a narrower interface: a plain
//! [`ProgressFn`] invoked with a monotonically increasing 0–100 percentage.
//! The orchestrator is the single place that fans one strategy's reports out
//! to the store and to this trait.

use crate::store::FileId;
use std::sync::Arc;

/// Percentage callback handed to a strategy for one file's conversion.
///
/// Invoked with monotonically increasing values; the final report is 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// A `ProgressFn` that discards every report.
pub fn noop_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// Called by the orchestrator as it processes a batch.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Methods may be called from blocking worker threads;
/// implementations must protect shared mutable state accordingly.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file is picked up.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file transitions to `Processing`.
    fn on_file_start(&self, id: FileId, name: &str) {
        let _ = (id, name);
    }

    /// Called on every progress report for a file. `percent` is 0–100 and
    /// non-decreasing within one processing episode.
    fn on_file_progress(&self, id: FileId, percent: u8) {
        let _ = (id, percent);
    }

    /// Called when a file completes, with the deliverable's size.
    fn on_file_complete(&self, id: FileId, output_bytes: usize) {
        let _ = (id, output_bytes);
    }

    /// Called when a file's conversion fails.
    fn on_file_error(&self, id: FileId, error: &str) {
        let _ = (id, error);
    }

    /// Called once after every eligible file has been attempted.
    fn on_batch_complete(&self, converted: usize, failed: usize) {
        let _ = (converted, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
