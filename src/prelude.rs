//! Common imports.

pub use crate::catch::{FaultCollector, FaultRecord, Location, PropagatedFault};
pub use crate::config::{Config, ConfigBuilder, FaultReporting};
pub use crate::error::{Error, Result};

#[cfg(feature = "telemetry")]
pub use crate::telemetry::MetricsSnapshot;

#[cfg(feature = "async")]
pub use crate::async_bridge::guard_future;
