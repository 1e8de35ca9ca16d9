//! Counters for guarded work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-collector fault counters
#[derive(Debug)]
pub struct Metrics {
    guards_run: AtomicU64,
    faults_caught: AtomicU64,
    faults_discarded: AtomicU64,

    // Creation time
    start_time: Instant,
}

impl Metrics {
    /// Counters at zero.
    pub fn new() -> Self {
        Self {
            guards_run: AtomicU64::new(0),
            faults_caught: AtomicU64::new(0),
            faults_discarded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record entry into a guard
    pub fn record_guard(&self) {
        self.guards_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fault intercepted by a guard
    pub fn record_fault(&self) {
        self.faults_caught.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fault that lost the commit race
    pub fn record_discard(&self) {
        self.faults_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Some(Instant::now()),
            uptime: self.start_time.elapsed(),
            guards_run: self.guards_run.load(Ordering::Relaxed),
            faults_caught: self.faults_caught.load(Ordering::Relaxed),
            faults_discarded: self.faults_discarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken.
    pub timestamp: Option<Instant>,
    /// Time since the collector was created.
    pub uptime: Duration,
    /// Guard calls entered.
    pub guards_run: u64,
    /// Panics intercepted, winners and losers.
    pub faults_caught: u64,
    /// Panics dropped after losing the commit race.
    pub faults_discarded: u64,
}

impl MetricsSnapshot {
    /// Faults that were committed; never more than one.
    pub fn faults_committed(&self) -> u64 {
        self.faults_caught.saturating_sub(self.faults_discarded)
    }
}
