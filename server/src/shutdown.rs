//! Deferred termination.
//!
//! An interrupt that arrives between connections ends the process at once.
//! One that arrives while a connection is being served only raises a flag,
//! which the accept loop checks before it waits for the next client.
//!
//! The cumulative statistics live behind the same lock as the
//! "connection active" flag, so the signal thread never observes a
//! half-merged table. A connection counts as active only once `accept`
//! has returned; an interrupt landing just before that drops the freshly
//! accepted client unserved, which it sees as an early close.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use pcc::Tally;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct State {
    active: bool,
    totals: Tally,
}

/// What the signal handler should do with an interrupt.
#[derive(Debug)]
pub enum Interrupt<'a> {
    /// A connection is in flight; the loop stops once it is done.
    Deferred,
    /// The server is idle. Report these statistics and exit while holding
    /// the guard, so the accept loop cannot start another connection.
    Terminate(MappedMutexGuard<'a, Tally>),
}

#[derive(Default)]
pub struct Shutdown {
    requested: AtomicBool,
    state: Mutex<State>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) -> Interrupt<'_> {
        let state = self.state.lock();
        if state.active {
            self.requested.store(true, Ordering::SeqCst);
            Interrupt::Deferred
        } else {
            Interrupt::Terminate(MutexGuard::map(state, |s| &mut s.totals))
        }
    }

    pub fn termination_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn begin(&self) {
        self.state.lock().active = true;
    }

    pub fn finish(&self, completed: Option<&Tally>) {
        let mut state = self.state.lock();
        if let Some(tally) = completed {
            state.totals.merge(tally);
        }
        state.active = false;
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Lock the cumulative statistics.
    ///
    /// When reporting on termination, keep the guard until the process exits.
    pub fn statistics(&self) -> MappedMutexGuard<'_, Tally> {
        MutexGuard::map(self.state.lock(), |s| &mut s.totals)
    }
}
