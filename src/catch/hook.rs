// panic-site diagnostics
//
// Once `catch_unwind` returns, the frames of the panicking code are gone. The
// hook installed here runs at the panic site instead, so while a guard is
// active on the current thread it snapshots the stack into `PENDING` where the
// guard picks it up after recovery.

use super::record::{Location, PropagatedFault};
use crate::config::{Config, FaultReporting};
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CaptureSettings {
    pub max_frames: usize,
    pub format_trace: bool,
    pub reporting: FaultReporting,
}

impl From<&Config> for CaptureSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_frames: config.max_frames,
            format_trace: config.format_trace,
            reporting: config.reporting,
        }
    }
}

/// Diagnostics taken at the moment of a fault.
#[derive(Debug, Clone)]
pub(crate) struct Capture {
    pub callers: Vec<usize>,
    pub stack: Vec<u8>,
    pub location: Option<Location>,
    pub thread: String,
}

impl Capture {
    pub fn take(settings: &CaptureSettings, location: Option<Location>) -> Self {
        let mut callers = Vec::with_capacity(settings.max_frames);
        backtrace::trace(|frame| {
            callers.push(frame.ip() as usize);
            callers.len() < settings.max_frames
        });
        // walked innermost first, stored oldest first
        callers.reverse();

        let current = thread::current();
        let thread = thread_label(&current);

        let stack = if settings.format_trace {
            let mut out = String::new();
            let _ = writeln!(out, "thread {} ({:?}):", thread, current.id());
            let _ = write!(out, "{:?}", backtrace::Backtrace::new());
            out.into_bytes()
        } else {
            Vec::new()
        };

        Self {
            callers,
            stack,
            location,
            thread,
        }
    }
}

/// Identifies the payload a capture was taken for.
///
/// Panics resumed with `resume_unwind` skip the hook, so a capture left by an
/// earlier panic must not be attributed to them. Non-string payloads of the
/// same type cannot be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    type_id: TypeId,
    message: Option<String>,
}

impl Fingerprint {
    pub fn of(payload: &(dyn Any + Send)) -> Self {
        let any: &dyn Any = payload;
        let message = if let Some(s) = any.downcast_ref::<&str>() {
            Some(s.to_string())
        } else {
            any.downcast_ref::<String>().cloned()
        };

        Self {
            type_id: any.type_id(),
            message,
        }
    }
}

/// A capture taken by the hook, waiting to be claimed by its guard.
#[derive(Debug)]
pub(crate) struct Pending {
    fingerprint: Fingerprint,
    capture: Capture,
}

impl Pending {
    /// The capture, if it was taken for `payload`.
    pub fn claim(self, payload: &(dyn Any + Send)) -> Option<Capture> {
        (self.fingerprint == Fingerprint::of(payload)).then_some(self.capture)
    }
}

thread_local! {
    static ACTIVE: Cell<Option<CaptureSettings>> = const { Cell::new(None) };
    static PENDING: RefCell<Option<Pending>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Install the chained panic hook. Only the first call has an effect.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let active = ACTIVE.try_with(Cell::get).ok().flatten();

            if let Some(settings) = active {
                let location = info.location().map(Location::from);
                let capture = Capture::take(&settings, location);

                match settings.reporting {
                    FaultReporting::Silent => {}
                    FaultReporting::Log => tracing::debug!(
                        thread = capture.thread.as_str(),
                        location = ?capture.location.as_ref().map(ToString::to_string),
                        "panic inside guarded work"
                    ),
                    FaultReporting::ChainDefault => previous(info),
                }

                let pending = Pending {
                    fingerprint: Fingerprint::of(info.payload()),
                    capture,
                };
                let _ = PENDING.try_with(|slot| *slot.borrow_mut() = Some(pending));
                return;
            }

            // the default hook renders non-string payloads as `Box<dyn Any>`
            if let Some(fault) = info.payload().downcast_ref::<PropagatedFault>() {
                let current = thread::current();
                match info.location() {
                    Some(loc) => eprintln!(
                        "thread {} panicked at {}:\n{}",
                        thread_label(&current),
                        loc,
                        fault
                    ),
                    None => eprintln!("thread {} panicked:\n{}", thread_label(&current), fault),
                }
                return;
            }

            previous(info);
        }));
    });
}

/// Marks the current thread as running guarded work until dropped.
pub(crate) struct ActiveScope {
    previous: Option<CaptureSettings>,
}

impl ActiveScope {
    pub fn enter(settings: CaptureSettings) -> Self {
        let previous = ACTIVE.with(|active| active.replace(Some(settings)));
        let _ = take_pending();
        Self { previous }
    }

    /// Leave the scope and hand over the last capture the hook took inside it.
    pub fn finish(self) -> Option<Pending> {
        let pending = take_pending();
        drop(self);
        pending
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.set(self.previous));
    }
}

pub(crate) fn take_pending() -> Option<Pending> {
    PENDING
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}

/// Capture for `payload`: the hook's if it belongs to this payload, otherwise
/// whatever is left of the stack at recovery time.
pub(crate) fn capture_for(
    pending: Option<Pending>,
    payload: &(dyn Any + Send),
    settings: &CaptureSettings,
) -> Capture {
    pending
        .and_then(|pending| pending.claim(payload))
        .unwrap_or_else(|| Capture::take(settings, None))
}

/// Drop `value`, keeping any panic from its `Drop` on this side.
///
/// The hook runs in a silent scope so the panic neither prints nor leaks a
/// capture into an enclosing guard.
pub(crate) fn drop_contained<T>(value: T) {
    let scope = ActiveScope::enter(CaptureSettings {
        max_frames: 1,
        format_trace: false,
        reporting: FaultReporting::Silent,
    });
    if let Err(nested) = panic::catch_unwind(AssertUnwindSafe(move || drop(value))) {
        // its own `Drop` may panic as well
        std::mem::forget(nested);
    }
    let _ = scope.finish();
}

fn thread_label(thread: &thread::Thread) -> String {
    format!("'{}'", thread.name().unwrap_or("<unnamed>"))
}
