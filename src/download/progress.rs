//! Progress reporting hooks for download runs.
//!
//! The engine never prints. It reports what happens to each descriptor through
//! a [`ProgressObserver`]; the CLI renders those events as progress bars and
//! notices. Observers are purely observational and cannot affect control flow.

use std::sync::Mutex;
use std::time::Duration;

use super::DownloadError;
use crate::FileDescriptor;

/// Receives per-descriptor events from the engine.
///
/// Every method has a no-op default so observers only implement what they
/// display. Implementations must be cheap; they are called from worker tasks.
pub trait ProgressObserver: Send + Sync {
    /// A descriptor is about to be processed as item `current` of `total`.
    fn on_start(&self, _file: &FileDescriptor, _current: usize, _total: usize) {}

    /// The local copy already matches the remote size.
    fn on_skip(&self, _file: &FileDescriptor) {}

    /// A local file exists with a different size and will be replaced.
    ///
    /// Only emitted when the run is configured as verbose.
    fn on_size_mismatch(&self, _file: &FileDescriptor, _local: u64, _remote: u64) {}

    /// Attempt `attempt` failed and the next one starts after `delay`.
    fn on_retry(
        &self,
        _file: &FileDescriptor,
        _attempt: u32,
        _delay: Duration,
        _error: &DownloadError,
    ) {
    }

    /// A body transfer is starting; returns the handle fed with byte counts.
    fn begin_transfer(
        &self,
        _file: &FileDescriptor,
        _content_length: Option<u64>,
    ) -> Box<dyn TransferProgress> {
        Box::new(NoProgress)
    }
}

/// Byte-level progress sink for one in-flight transfer.
pub trait TransferProgress: Send + Sync {
    /// `bytes` more bytes were written.
    fn advance(&self, _bytes: u64) {}

    /// The transfer completed and was published.
    fn finish(&self) {}

    /// The transfer stopped before completion.
    fn abandon(&self) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

impl TransferProgress for NoProgress {}

/// Shared `current/total` counter for parallel runs.
///
/// Owned by the coordinator and handed to worker tasks by `Arc`. The index a
/// unit reports is one past the number of units completed when it was
/// admitted, so reported indices follow completion order.
#[derive(Debug)]
pub struct ProgressCounter {
    completed: Mutex<usize>,
    total: usize,
}

impl ProgressCounter {
    /// Creates a counter for a run of `total` descriptors.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Mutex::new(0),
            total,
        }
    }

    /// Total number of descriptors in the run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Index to report for a unit admitted now.
    #[must_use]
    pub fn current(&self) -> usize {
        let completed = self
            .completed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        (*completed + 1).min(self.total)
    }

    /// Records that a unit finished successfully (completed or skipped).
    pub fn record_completed(&self) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *completed += 1;
    }

    /// Number of units completed so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        *self
            .completed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
