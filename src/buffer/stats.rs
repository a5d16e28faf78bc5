// Lock-free dispatcher counters.
//
// Producers and the worker update these without coordination; readers take
// a plain snapshot.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DispatcherStats {
    appended: AtomicU64,
    dropped: AtomicU64,
    filtered: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    flushes: AtomicU64,
    bulk_flushes: AtomicU64,
}

impl DispatcherStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_appended(&self) {
        self.appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Record refused because the queue was full or closed.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, records: usize, success: bool) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if records > 1 {
            self.bulk_flushes.fetch_add(1, Ordering::Relaxed);
        }
        let counter = if success {
            &self.delivered
        } else {
            &self.failed
        };
        counter.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            appended: self.appended.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            bulk_flushes: self.bulk_flushes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStatsSnapshot {
    pub appended: u64,
    pub dropped: u64,
    pub filtered: u64,
    pub delivered: u64,
    pub failed: u64,
    pub flushes: u64,
    pub bulk_flushes: u64,
}
