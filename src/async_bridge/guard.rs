//! Future counterpart of the guard.

use crate::catch::hook::{self, ActiveScope, CaptureSettings};
use crate::catch::FaultCollector;
use futures::{Future, FutureExt};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Await `future` through `collector`.
///
/// Returns the output when the future completes and `None` when one of its
/// polls panicked; the panic is handled exactly like one caught by
/// [`FaultCollector::guard`].
pub async fn guard_future<F>(collector: &FaultCollector, future: F) -> Option<F::Output>
where
    F: Future,
{
    collector.guard_future(future).await
}

impl FaultCollector {
    /// See [`guard_future`].
    pub async fn guard_future<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        self.metrics.record_guard();

        let settings = self.settings();
        let scoped = CaptureScope {
            inner: Box::pin(future),
            settings,
        };

        match AssertUnwindSafe(scoped).catch_unwind().await {
            Ok(value) => Some(value),
            Err(payload) => {
                // still on the thread whose poll panicked
                let capture = hook::capture_for(hook::take_pending(), &*payload, &settings);
                self.commit(payload, capture);
                None
            }
        }
    }
}

// marks every poll of `inner` as guarded work
struct CaptureScope<F: Future> {
    inner: Pin<Box<F>>,
    settings: CaptureSettings,
}

impl<F: Future> Future for CaptureScope<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let this = self.get_mut();
        let _scope = ActiveScope::enter(this.settings);
        this.inner.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, FaultReporting};
    use futures::executor::block_on;

    fn silent() -> FaultCollector {
        let config = Config::builder()
            .reporting(FaultReporting::Silent)
            .build()
            .unwrap();
        FaultCollector::with_config(config).unwrap()
    }

    #[test]
    fn test_future_completes() {
        let collector = silent();
        let value = block_on(guard_future(&collector, async { 7 }));
        assert_eq!(value, Some(7));
        assert!(collector.first_fault().is_none());
    }

    #[test]
    fn test_future_panic_is_captured() {
        let collector = silent();

        let value: Option<()> = block_on(collector.guard_future(async {
            futures::future::ready(()).await;
            panic!("async boom");
        }));

        assert!(value.is_none());
        let record = collector.first_fault().unwrap();
        assert_eq!(record.message(), Some("async boom"));
        assert!(record.location().unwrap().file.ends_with("guard.rs"));
    }

    #[test]
    fn test_concurrent_futures_single_winner() {
        let collector = silent();

        block_on(async {
            let guarded = (0..10).map(|i| {
                let collector = &collector;
                async move {
                    collector
                        .guard_future(async move {
                            if i % 2 == 0 {
                                panic!("future {}", i);
                            }
                        })
                        .await
                }
            });
            futures::future::join_all(guarded).await;
        });

        let message = collector.first_fault().unwrap().message().unwrap().to_string();
        assert!(["future 0", "future 2", "future 4", "future 6", "future 8"]
            .contains(&message.as_str()));
    }

    #[test]
    fn test_resumed_panic_in_future_gets_own_diagnostics() {
        let collector = silent();

        let value: Option<()> = block_on(collector.guard_future(async {
            let _ = std::panic::catch_unwind(|| panic!("swallowed in poll"));
            std::panic::resume_unwind(Box::new(5u16));
        }));

        assert!(value.is_none());
        let record = collector.first_fault().unwrap();
        assert_eq!(record.downcast_origin::<u16>(), Some(5));
        assert!(record.location().is_none());
    }
}
