//! Panic capture for concurrent workers.
//!
//! Workers run their closures through [`FaultCollector::guard`]; the first
//! panic to commit is kept as a [`FaultRecord`] and can be re-raised later by
//! the supervisor as a [`PropagatedFault`].

pub mod collector;
pub(crate) mod hook;
pub mod record;

pub use collector::FaultCollector;
pub use record::{FaultRecord, Location, PropagatedFault};
