//! Byte-level progress accounting for a transfer batch
//!
//! A [`ProgressTracker`] is created with the batch total and advanced by the
//! transfer workers as the store reports bytes. Rendering is delegated to an
//! optional [`ProgressSink`] and never feeds back into the numbers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback handed to the store while a single object moves
pub trait BytesTransferred: Send + Sync {
    /// Called with the number of bytes completed since the previous call
    fn on_bytes_transferred(&self, delta: u64);
}

/// Presentation hook for batch progress (progress bars, log lines)
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// A batch of `total` bytes is starting
    fn on_start(&self, total: u64);

    /// `completed` of `total` bytes are done
    fn on_advance(&self, completed: u64, total: u64);

    /// The batch has ended, successfully or not
    fn on_finish(&self, completed: u64, total: u64);
}

/// Thread-safe accumulator of completed bytes against a fixed total
pub struct ProgressTracker {
    total_bytes: u64,
    completed_bytes: AtomicU64,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            completed_bytes: AtomicU64::new(0),
            sink: None,
        }
    }

    /// Create a tracker that reports to `sink`, announcing the batch immediately
    pub fn with_sink(total_bytes: u64, sink: Arc<dyn ProgressSink>) -> Self {
        sink.on_start(total_bytes);
        Self {
            total_bytes,
            completed_bytes: AtomicU64::new(0),
            sink: Some(sink),
        }
    }

    /// Add `delta` completed bytes
    pub fn advance(&self, delta: u64) {
        if delta == 0 {
            return;
        }
        let completed = self.completed_bytes.fetch_add(delta, Ordering::AcqRel) + delta;
        if let Some(sink) = &self.sink {
            sink.on_advance(completed, self.total_bytes);
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes.load(Ordering::Acquire)
    }

    /// Completed fraction in `[0, 1]`; an empty batch counts as complete
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.completed_bytes() as f64 / self.total_bytes as f64).min(1.0)
    }

    /// Tell the sink the batch is over
    pub fn finish(&self) {
        if let Some(sink) = &self.sink {
            sink.on_finish(self.completed_bytes(), self.total_bytes);
        }
    }
}

impl BytesTransferred for ProgressTracker {
    fn on_bytes_transferred(&self, delta: u64) {
        self.advance(delta);
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_bytes", &self.total_bytes)
            .field("completed_bytes", &self.completed_bytes())
            .finish()
    }
}
