//! Guarding futures.
//!
//! The same contract as [`FaultCollector::guard`], but the panic may come from
//! any poll of the future, on whichever thread polls it.

pub mod guard;

pub use guard::guard_future;
