use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::Notify;
use tracing::info;

/// Tracks the extraction tasks in flight, so the shutdown can wait for them
///
/// Each task registers itself before being spawned and holds the returned guard until
/// it ends: dropping the guard deregisters the task, whatever the way the task ended.
/// Cloning the controller shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct DrainController {
    inner: Arc<DrainControllerInner>,
}

#[derive(Debug, Default)]
struct DrainControllerInner {
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Registration of one task in the drain controller
#[derive(Debug)]
#[must_use = "the task is deregistered as soon as the guard is dropped"]
pub struct InFlightGuard {
    inner: Arc<DrainControllerInner>,
}

impl DrainController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> InFlightGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);

        InFlightGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until every registered task has deregistered
    ///
    /// Returns immediately if nothing is in flight. No timeout is applied.
    pub async fn wait_all(&self) {
        loop {
            let drained = self.inner.drained.notified();
            tokio::pin!(drained);
            // Registers as a waiter before reading the count, so a deregistration
            // happening in between is not missed
            drained.as_mut().enable();

            let in_flight = self.in_flight();
            if in_flight == 0 {
                return;
            }

            info!(in_flight, "Waiting for in flight extractions to complete");
            drained.await;
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}
