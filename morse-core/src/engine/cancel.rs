//! Deadline waits that a stop request can interrupt.
//!
//! Every suspension point of the scheduler goes through `CancelToken`, so a
//! cancelled player wakes immediately instead of finishing its current sleep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cloneable one-shot cancellation flag with blocking deadline waits.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark cancelled and wake every waiter.
    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block until `deadline`. Returns `false` if cancelled first (or already).
    ///
    /// A deadline in the past returns immediately, which lets a caller that
    /// fell behind catch up without accumulating drift.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self.inner.wake.wait_until(&mut cancelled, deadline).timed_out() {
                return !*cancelled;
            }
        }
        false
    }

    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_runs_to_deadline_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(token.wait_for(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn past_deadline_returns_immediately() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(token.wait_until(start - Duration::from_millis(5)));
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_a_sleeping_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let completed = waiter.wait_for(Duration::from_secs(10));
            (completed, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (completed, elapsed) = handle.join().expect("waiter panicked");

        assert!(!completed);
        assert!(elapsed < Duration::from_secs(1), "woke after {elapsed:?}");
    }

    #[test]
    fn cancelled_token_never_waits() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(!token.wait_for(Duration::from_secs(5)));
    }
}
