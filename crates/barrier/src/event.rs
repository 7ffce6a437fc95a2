// SPDX-License-Identifier: Apache-2.0

//! Manual-reset event backing the hard-wait path.

use parking_lot::{Condvar, Mutex};

/// A manual-reset event.
///
/// Once set, every current and future waiter passes through until the event
/// is explicitly [`reset`](WaitEvent::reset). This mirrors the semantics of a
/// manual-reset kernel event object: `set` wakes all blocked threads, and the
/// signaled state persists across the wakeup.
#[derive(Debug, Default)]
pub struct WaitEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl WaitEvent {
    /// Creates the event in the reset (non-signaled) state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends the calling thread until the event is set.
    ///
    /// Returns immediately if the event is already signaled.
    pub fn block_until_set(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
    }

    /// Sets the event, waking all blocked threads.
    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        let _ = self.cond.notify_all();
    }

    /// Clears the signaled state.
    pub fn reset(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = false;
    }
}
