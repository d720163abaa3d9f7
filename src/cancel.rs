//! Cancellable waits.
//!
//! A [`CancellationToken`] is shared between the Ctrl-C handler and a running
//! job. Cancelling wakes every thread blocked in [`CancellationToken::wait_for`]
//! immediately.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut flag = self.inner.cancelled.lock();
        *flag = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for `duration` unless cancelled first. A duration too large
    /// to form a deadline waits until cancelled.
    pub fn wait_for(&self, duration: Duration) -> WaitOutcome {
        let deadline = Instant::now().checked_add(duration);
        let mut flag = self.inner.cancelled.lock();
        while !*flag {
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut flag, deadline).timed_out() {
                        return if *flag {
                            WaitOutcome::Cancelled
                        } else {
                            WaitOutcome::Elapsed
                        };
                    }
                }
                None => self.inner.cond.wait(&mut flag),
            }
        }
        WaitOutcome::Cancelled
    }
}
