//! Cancellation for the timeout grace wait.
//!
//! A cloned [`InterruptSignal`] can be raised from another thread (for
//! example a Ctrl-C handler). A grace sleep that observes it returns early and
//! the caller re-raises the signal so outer code can still see it.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How a [`InterruptSignal::sleep`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepOutcome {
    Completed,
    Interrupted,
}

#[derive(Debug, Default)]
struct Inner {
    raised: Mutex<bool>,
    wake: Condvar,
}

/// Shared interrupt flag.
#[derive(Clone, Debug, Default)]
pub struct InterruptSignal {
    inner: Arc<Inner>,
}

impl InterruptSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake any sleeper.
    pub fn raise(&self) {
        let mut raised = self
            .inner
            .raised
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *raised = true;
        self.inner.wake.notify_all();
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self
            .inner
            .raised
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        let mut raised = self
            .inner
            .raised
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *raised, false)
    }

    /// Sleep for `duration` unless the flag is raised first.
    ///
    /// An interrupt clears the flag; callers re-raise it once they have
    /// finished their own handling.
    pub fn sleep(&self, duration: Duration) -> SleepOutcome {
        let deadline = Instant::now() + duration;
        let mut raised = self
            .inner
            .raised
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if *raised {
                *raised = false;
                return SleepOutcome::Interrupted;
            }
            let now = Instant::now();
            if now >= deadline {
                return SleepOutcome::Completed;
            }
            let (guard, _) = self
                .inner
                .wake
                .wait_timeout(raised, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            raised = guard;
        }
    }
}
