//! fault-collector - first-panic capture for concurrent workers
//!
//! A supervisor that waits on N workers needs one deterministic way to surface
//! whichever worker panicked first, without losing the other workers' normal
//! completion and without silently swallowing crashes. Every worker wraps its
//! unit of work in [`FaultCollector::guard`]; the first panic to commit is
//! kept with its payload and origin stack, all later ones are dropped.
//!
//! # Quick Start
//!
//! ```should_panic
//! use fault_collector::prelude::*;
//!
//! let collector = FaultCollector::new();
//!
//! std::thread::scope(|s| {
//!     for i in 0..8 {
//!         let collector = &collector;
//!         s.spawn(move || {
//!             collector.guard(|| {
//!                 if i == 5 {
//!                     panic!("worker {} failed", i);
//!                 }
//!             });
//!         });
//!     }
//! });
//!
//! // every worker has returned; fail loudly in the supervisor
//! collector.reraise();
//! ```
//!
//! # Features
//!
//! - **telemetry** (default): per-collector guard/fault counters
//! - **async**: `FaultCollector::guard_future` for futures

#![warn(missing_docs, missing_debug_implementations)]

pub mod catch;
pub mod config;
pub mod error;
pub mod prelude;
pub mod telemetry;

#[cfg(feature = "async")]
pub mod async_bridge;

pub use catch::{FaultCollector, FaultRecord, Location, PropagatedFault};
pub use config::{Config, ConfigBuilder, FaultReporting};
pub use error::{Error, Result};
