// attendance-record: in-flight request counter

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

/// Counts pending network operations and publishes a single "busy" flag.
///
/// Shared process-wide behind an `Arc`. Overlapping requests coalesce: the
/// flag only drops back to `false` when the last one finishes.
#[derive(Debug)]
pub struct RequestCounter {
    active: Mutex<usize>,
    busy: watch::Sender<bool>,
}

impl Default for RequestCounter {
    fn default() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            active: Mutex::new(0),
            busy,
        }
    }
}

impl RequestCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn start(&self) {
        let mut active = self.lock();
        *active += 1;
        self.publish(*active);
    }

    /// Never goes below zero.
    pub fn stop(&self) {
        let mut active = self.lock();
        *active = active.saturating_sub(1);
        self.publish(*active);
    }

    /// Force the indicator off, e.g. when a navigation is cancelled.
    pub fn reset(&self) {
        let mut active = self.lock();
        if *active > 0 {
            tracing::debug!(pending = *active, "Request counter reset");
        }
        *active = 0;
        self.publish(0);
    }

    /// Start a request whose `stop` runs when the returned guard drops.
    pub fn track(self: &Arc<Self>) -> RequestGuard {
        self.start();
        RequestGuard {
            counter: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        *self.lock()
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Stream of busy-state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    fn publish(&self, active: usize) {
        let busy = active > 0;
        self.busy.send_if_modified(|current| {
            let changed = *current != busy;
            *current = busy;
            changed
        });
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pairs one `start` with exactly one `stop`, on every exit path.
#[must_use = "dropping the guard immediately ends the request"]
#[derive(Debug)]
pub struct RequestGuard {
    counter: Arc<RequestCounter>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.counter.stop();
    }
}
