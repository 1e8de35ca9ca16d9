//! The shared collector and its guard operations.

use super::hook::{self, ActiveScope, Capture, CaptureSettings};
use super::record::{FaultRecord, PropagatedFault};
use crate::config::{Config, FaultReporting};
use crate::error::Result;
use crate::telemetry::{Metrics, MetricsSnapshot};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Catches panics from any number of concurrent guarded calls and keeps the
/// first one that commits.
///
/// Share one collector per join group, either by reference through scoped
/// threads or inside an `Arc`. After every worker has returned from
/// [`guard`](Self::guard), the supervisor calls [`reraise`](Self::reraise) to
/// fail in its own context, or [`first_fault`](Self::first_fault) to inspect.
///
/// "First" is the first fault to win the compare-and-set on the slot, not the
/// earliest one by wall clock.
///
/// ```
/// use fault_collector::FaultCollector;
///
/// let collector = FaultCollector::new();
/// std::thread::scope(|s| {
///     for i in 0..4 {
///         let collector = &collector;
///         s.spawn(move || collector.guard(|| if i == 2 { panic!("worker {}", i) }));
///     }
/// });
///
/// let fault = collector.first_fault().unwrap();
/// assert_eq!(fault.message(), Some("worker 2"));
/// ```
pub struct FaultCollector {
    // null until the winning guard publishes an `Arc::into_raw` pointer
    caught: AtomicPtr<FaultRecord>,
    config: Config,
    pub(crate) metrics: Metrics,
    _owns: PhantomData<Arc<FaultRecord>>,
}

impl FaultCollector {
    /// A collector with the default [`Config`].
    pub fn new() -> Self {
        Self::from_valid_config(Config::default())
    }

    /// A collector using `config`, rejected if it does not validate.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: Config) -> Self {
        hook::install();
        Self {
            caught: AtomicPtr::new(ptr::null_mut()),
            config,
            metrics: Metrics::new(),
            _owns: PhantomData,
        }
    }

    /// The configuration this collector captures with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `work` on the calling thread, catching any panic it raises.
    ///
    /// Never panics itself because of `work`. A caught panic is recorded if no
    /// other fault has been committed yet, otherwise it is dropped.
    pub fn guard<F>(&self, work: F)
    where
        F: FnOnce(),
    {
        let _ = self.guard_with(work);
    }

    /// Like [`guard`](Self::guard), returning the value of `work` when it
    /// completes and `None` when it panicked.
    pub fn guard_with<F, R>(&self, work: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        self.metrics.record_guard();

        let settings = self.settings();
        let scope = ActiveScope::enter(settings);
        let result = panic::catch_unwind(AssertUnwindSafe(work));
        let pending = scope.finish();

        match result {
            Ok(value) => Some(value),
            Err(payload) => {
                let capture = hook::capture_for(pending, &*payload, &settings);
                self.commit(payload, capture);
                None
            }
        }
    }

    pub(crate) fn settings(&self) -> CaptureSettings {
        CaptureSettings::from(&self.config)
    }

    pub(crate) fn commit(&self, payload: Box<dyn std::any::Any + Send>, capture: Capture) {
        self.metrics.record_fault();

        let record = Arc::new(FaultRecord::new(payload, capture));
        if self.config.reporting == FaultReporting::Log {
            tracing::warn!(
                thread = record.thread(),
                location = ?record.location().map(ToString::to_string),
                message = record.message().unwrap_or("<non-string payload>"),
                "guarded work panicked"
            );
        }

        let raw = Arc::into_raw(record) as *mut FaultRecord;
        match self
            .caught
            .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => tracing::debug!("fault committed"),
            Err(_) => {
                // SAFETY: `raw` came from `Arc::into_raw` above and was never published.
                let loser = unsafe { Arc::from_raw(raw) };
                // the payload's `Drop` runs here and must not escape the guard
                hook::drop_contained(loser);
                self.metrics.record_discard();
                tracing::trace!("fault discarded, another one was committed first");
            }
        }
    }

    /// The committed fault, if any. Every call after settlement returns the
    /// same record.
    pub fn first_fault(&self) -> Option<Arc<FaultRecord>> {
        let raw = self.caught.load(Ordering::Acquire);
        if raw.is_null() {
            return None;
        }

        // SAFETY: a published pointer keeps the strong count it was created
        // with until `drop`, which cannot run while `&self` is borrowed.
        unsafe {
            Arc::increment_strong_count(raw);
            Some(Arc::from_raw(raw))
        }
    }

    /// Whether a fault has been committed.
    pub fn is_faulted(&self) -> bool {
        !self.caught.load(Ordering::Acquire).is_null()
    }

    /// Panic on the calling thread with the committed fault, wrapped in a
    /// [`PropagatedFault`]. Does nothing when no guard caught a panic.
    ///
    /// Call only after every worker has returned from its guard.
    pub fn reraise(&self) {
        if let Some(record) = self.first_fault() {
            tracing::error!(
                thread = record.thread(),
                message = record.message().unwrap_or("<non-string payload>"),
                "re-raising panic from guarded work"
            );
            panic::panic_any(PropagatedFault::new(record));
        }
    }

    /// Error-returning counterpart of [`reraise`](Self::reraise).
    pub fn check(&self) -> Result<()> {
        match self.first_fault() {
            Some(record) => Err(PropagatedFault::new(record).into()),
            None => Ok(()),
        }
    }

    /// Guard and fault counters for this collector.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for FaultCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FaultCollector {
    fn drop(&mut self) {
        let raw = *self.caught.get_mut();
        if !raw.is_null() {
            // SAFETY: the slot owns one strong count, released exactly once here.
            drop(unsafe { Arc::from_raw(raw) });
        }
    }
}

impl std::fmt::Debug for FaultCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultCollector")
            .field("first_fault", &self.first_fault())
            .field("config", &self.config)
            .finish()
    }
}
