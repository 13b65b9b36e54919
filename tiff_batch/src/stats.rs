//! Run Statistics
//!
//! Workers add to [`RunStats`] through atomic operations only. The totals are
//! read once, after the worker pool has drained, via [`RunStats::summary`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct RunStats {
    original_bytes: AtomicU64,
    compressed_bytes: AtomicU64,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_original_bytes(&self, bytes: u64) {
        self.original_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_compressed_bytes(&self, bytes: u64) {
        self.compressed_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_success(&self, original_bytes: u64, compressed_bytes: u64) {
        self.add_original_bytes(original_bytes);
        self.add_compressed_bytes(compressed_bytes);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters. Only meaningful once all workers joined.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            original_bytes: self.original_bytes.load(Ordering::Relaxed),
            compressed_bytes: self.compressed_bytes.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunSummary {
    /// Negative when recompression grew the files.
    pub fn saved_bytes(&self) -> i128 {
        i128::from(self.original_bytes) - i128::from(self.compressed_bytes)
    }

    /// 0.0 when nothing was measured.
    pub fn saved_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            0.0
        } else {
            self.saved_bytes() as f64 / self.original_bytes as f64 * 100.0
        }
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }
}
