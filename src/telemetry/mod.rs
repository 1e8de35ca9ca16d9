//! Telemetry for guarded work.
//!
//! Counts guards, caught faults, and faults dropped after losing the commit
//! race.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
#[allow(missing_docs)]
pub mod metrics {
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_guard(&self) {}
        pub fn record_fault(&self) {}
        pub fn record_discard(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub timestamp: Option<Instant>,
        pub uptime: Duration,
        pub guards_run: u64,
        pub faults_caught: u64,
        pub faults_discarded: u64,
    }

    impl MetricsSnapshot {
        pub fn faults_committed(&self) -> u64 { 0 }
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
