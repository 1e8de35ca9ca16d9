//! Crate error type.

use crate::catch::PropagatedFault;

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A [`Config`](crate::Config) failed validation.
    #[error("config error: {0}")]
    Config(String),

    /// A guarded panic, surfaced by [`FaultCollector::check`](crate::FaultCollector::check).
    #[error(transparent)]
    Propagated(#[from] PropagatedFault),
}

impl Error {
    /// Build an [`Error::Config`].
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// The propagated fault, if this error carries one.
    pub fn as_fault(&self) -> Option<&PropagatedFault> {
        match self {
            Error::Propagated(fault) => Some(fault),
            _ => None,
        }
    }
}
