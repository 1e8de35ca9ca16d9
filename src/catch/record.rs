//! Fault records and the re-raised fault type.

use super::hook::Capture;
use parking_lot::ReentrantMutex;
use std::any::Any;
use std::borrow::Cow;
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

/// Source position of a `panic!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Source file, as `file!()` reports it.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl From<&std::panic::Location<'_>> for Location {
    fn from(loc: &std::panic::Location<'_>) -> Self {
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A panic caught by a guard, with the diagnostics taken when it happened.
///
/// The payload is kept exactly as it was raised. Records are immutable and
/// shared as `Arc<FaultRecord>`.
pub struct FaultRecord {
    // only `Send`; the lock makes the record shareable. Reentrant so origin
    // accessors can be nested on one thread.
    origin: ReentrantMutex<Box<dyn Any + Send>>,
    message: Option<String>,
    callers: Vec<usize>,
    stack: Vec<u8>,
    location: Option<Location>,
    thread: String,
}

impl FaultRecord {
    pub(crate) fn new(origin: Box<dyn Any + Send>, capture: Capture) -> Self {
        let message = payload_message(&*origin);
        Self {
            origin: ReentrantMutex::new(origin),
            message,
            callers: capture.callers,
            stack: capture.stack,
            location: capture.location,
            thread: capture.thread,
        }
    }

    /// Run `f` against the original payload.
    ///
    /// Other threads touching the same payload wait until `f` returns; calls
    /// nested inside `f` on this thread do not.
    pub fn with_origin<R>(&self, f: impl FnOnce(&(dyn Any + Send)) -> R) -> R {
        let origin = self.origin.lock();
        f(&**origin)
    }

    /// Clone the payload out if it is a `T`.
    pub fn downcast_origin<T: Any + Clone>(&self) -> Option<T> {
        self.with_origin(|origin| origin.downcast_ref::<T>().cloned())
    }

    /// Whether the payload is a `T`.
    pub fn origin_is<T: Any>(&self) -> bool {
        self.with_origin(|origin| origin.is::<T>())
    }

    /// Text of the payload when it was a string (`panic!` with a message).
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Instruction pointers of the captured frames, oldest first.
    pub fn callers(&self) -> &[usize] {
        &self.callers
    }

    /// Symbol names for [`callers`](Self::callers), resolved on demand.
    /// Frames without symbol information show up as their address.
    pub fn resolve_callers(&self) -> Vec<String> {
        self.callers
            .iter()
            .map(|&ip| {
                let mut name = None;
                backtrace::resolve(ip as *mut c_void, |symbol| {
                    if name.is_none() {
                        name = symbol.name().map(|n| n.to_string());
                    }
                });
                name.unwrap_or_else(|| format!("{:#x}", ip))
            })
            .collect()
    }

    /// Formatted stack of the faulting thread. Empty when trace formatting
    /// was disabled.
    pub fn stack(&self) -> &[u8] {
        &self.stack
    }

    /// [`stack`](Self::stack) as text.
    pub fn stack_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stack)
    }

    /// Where the panic was raised. `None` when the panic bypassed the hook,
    /// e.g. one resumed with `resume_unwind`.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Quoted name of the thread that panicked.
    pub fn thread(&self) -> &str {
        &self.thread
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Some(s.to_string())
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Some(s.clone())
    } else if let Some(fault) = payload.downcast_ref::<PropagatedFault>() {
        Some(fault.to_string())
    } else {
        None
    }
}

impl fmt::Debug for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultRecord")
            .field("message", &self.message)
            .field("location", &self.location)
            .field("thread", &self.thread)
            .field("callers", &self.callers.len())
            .field("stack_bytes", &self.stack.len())
            .finish()
    }
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "original value: {:?}", msg)?,
            None => write!(f, "original value: <non-string payload>")?,
        }
        match &self.location {
            Some(loc) => write!(f, "\n  at {} on thread {}", loc, self.thread)?,
            None => write!(f, "\n  on thread {}", self.thread)?,
        }
        if !self.stack.is_empty() {
            write!(f, "\nstacktrace: {}", self.stack_str())?;
        }
        Ok(())
    }
}

/// The fault raised by [`FaultCollector::reraise`](super::FaultCollector::reraise)
/// and returned by [`FaultCollector::check`](super::FaultCollector::check).
///
/// Wraps the stored record, so the original payload and the trace of the
/// failure site travel with it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("panic propagated from guarded work: {record}")]
pub struct PropagatedFault {
    record: Arc<FaultRecord>,
}

impl PropagatedFault {
    pub(crate) fn new(record: Arc<FaultRecord>) -> Self {
        Self { record }
    }

    /// The committed record this fault was raised from.
    pub fn record(&self) -> &Arc<FaultRecord> {
        &self.record
    }

    /// Unwrap into the committed record.
    pub fn into_record(self) -> Arc<FaultRecord> {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> Capture {
        Capture {
            callers: vec![0x10, 0x20],
            stack: b"thread 'main':\n  0: explode".to_vec(),
            location: Some(Location {
                file: "src/worker.rs".to_string(),
                line: 7,
                column: 9,
            }),
            thread: "'main'".to_string(),
        }
    }

    #[test]
    fn test_string_payload_message() {
        let record = FaultRecord::new(Box::new("boom"), capture());
        assert_eq!(record.message(), Some("boom"));
        assert_eq!(record.downcast_origin::<&str>(), Some("boom"));
        assert!(record.origin_is::<&str>());

        let record = FaultRecord::new(Box::new(String::from("owned")), capture());
        assert_eq!(record.message(), Some("owned"));
        assert!(!record.origin_is::<&str>());
    }

    #[test]
    fn test_opaque_payload_passes_through() {
        #[derive(Debug, Clone, PartialEq)]
        struct Code(u32);

        let record = FaultRecord::new(Box::new(Code(42)), capture());
        assert_eq!(record.message(), None);
        assert_eq!(record.downcast_origin::<Code>(), Some(Code(42)));
        assert_eq!(record.downcast_origin::<u32>(), None);
    }

    #[test]
    fn test_display_includes_origin_and_trace() {
        let record = FaultRecord::new(Box::new("boom"), capture());
        let text = record.to_string();
        assert!(text.starts_with("original value: \"boom\""));
        assert!(text.contains("src/worker.rs:7:9"));
        assert!(text.contains("explode"));
    }

    #[test]
    fn test_propagated_fault_message() {
        let record = Arc::new(FaultRecord::new(Box::new(7u8), capture()));
        let fault = PropagatedFault::new(record.clone());

        assert!(Arc::ptr_eq(fault.record(), &record));
        let text = fault.to_string();
        assert!(text.starts_with("panic propagated from guarded work"));
        assert!(text.contains("<non-string payload>"));
    }

    #[test]
    fn test_nested_origin_access() {
        let record = FaultRecord::new(Box::new(11i64), capture());

        let nested = record.with_origin(|origin| {
            origin.is::<i64>() && record.origin_is::<i64>() && record.downcast_origin::<i64>() == Some(11)
        });
        assert!(nested);
    }

    #[test]
    fn test_record_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FaultRecord>();
        assert_send_sync::<PropagatedFault>();
    }
}
