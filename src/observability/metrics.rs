//! Metrics registry
//!
//! - Counters only, monotonic increase
//! - Reset only on process start
//! - Relaxed atomics: exact totals, no ordering guarantees between counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by every channel of a process.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    records_created: AtomicU64,
    records_updated: AtomicU64,
    records_deleted: AtomicU64,
    records_restored: AtomicU64,
    recent_scans: AtomicU64,
    index_entries_scanned: AtomicU64,
    channels_opened: AtomicU64,
    channels_flushed: AtomicU64,
    operations_rejected: AtomicU64,
    operations_failed: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_created: u64,
    pub records_updated: u64,
    pub records_deleted: u64,
    pub records_restored: u64,
    pub recent_scans: u64,
    pub index_entries_scanned: u64,
    pub channels_opened: u64,
    pub channels_flushed: u64,
    pub operations_rejected: u64,
    pub operations_failed: u64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_records_created(&self) {
        self.records_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_updated(&self) {
        self.records_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_restored(&self) {
        self.records_restored.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one recent scan and the index entries it read
    pub fn record_recent_scan(&self, entries_scanned: u64) {
        self.recent_scans.fetch_add(1, Ordering::Relaxed);
        self.index_entries_scanned
            .fetch_add(entries_scanned, Ordering::Relaxed);
    }

    pub fn increment_channels_opened(&self) {
        self.channels_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_channels_flushed(&self) {
        self.channels_flushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Rejected: invalid input, unknown command, closed channel
    pub fn increment_operations_rejected(&self) {
        self.operations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Failed: storage errors and deadlines
    pub fn increment_operations_failed(&self) {
        self.operations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_created: self.records_created.load(Ordering::Relaxed),
            records_updated: self.records_updated.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            records_restored: self.records_restored.load(Ordering::Relaxed),
            recent_scans: self.recent_scans.load(Ordering::Relaxed),
            index_entries_scanned: self.index_entries_scanned.load(Ordering::Relaxed),
            channels_opened: self.channels_opened.load(Ordering::Relaxed),
            channels_flushed: self.channels_flushed.load(Ordering::Relaxed),
            operations_rejected: self.operations_rejected.load(Ordering::Relaxed),
            operations_failed: self.operations_failed.load(Ordering::Relaxed),
        }
    }
}
