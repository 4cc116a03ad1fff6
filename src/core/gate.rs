//! Drain barrier between ordinary operations and exclusive audits
//!
//! `AuditGate` is a reader/writer-style gate where the many "shared" holders
//! are ordinary account operations and the rare "exclusive" holder is an
//! audit that needs the whole set of accounts to stand still.
//!
//! # Protocol
//!
//! - `acquire_slot` blocks while an audit is pending or running, then counts
//!   the caller as in use. Dropping the returned `SlotGuard` ends the
//!   operation and wakes every waiter when the count reaches zero.
//! - `reserve_exclusive` raises the `auditing` flag right away, so no new
//!   slot can be handed out. `ExclusiveTicket::run` then waits for the slots
//!   already out to drain, runs the visitor, lowers the flag and wakes
//!   everyone.
//!
//! Reserving and running are split so a dispatcher can fix an audit's
//! position in the stream at submission time while a worker executes it
//! later. `exclusive` does both in one call.
//!
//! Every wait is a guarded loop: the state is re-checked after each wake-up
//! because the flag may have been raised again before the waiter ran.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

#[derive(Debug, Default)]
struct GateState {
    /// Operations currently allowed to touch arbitrary accounts
    in_use: usize,

    /// An exclusive reservation is pending or running
    auditing: bool,
}

/// Shared/exclusive drain barrier
#[derive(Debug, Default)]
pub struct AuditGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl AuditGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an ordinary operation
    ///
    /// Blocks while `auditing` is set. The slot is released when the guard
    /// is dropped, including during unwinding.
    pub fn acquire_slot(self: &Arc<Self>) -> SlotGuard {
        let mut state = self.state.lock();
        while state.auditing {
            self.changed.wait(&mut state);
        }
        state.in_use += 1;
        drop(state);

        SlotGuard {
            gate: Arc::clone(self),
        }
    }

    /// Raise the audit flag and return a ticket for running the audit
    ///
    /// Waits first if another exclusive reservation is still outstanding, so
    /// concurrent audits run one after another.
    pub fn reserve_exclusive(self: &Arc<Self>) -> ExclusiveTicket {
        let mut state = self.state.lock();
        while state.auditing {
            self.changed.wait(&mut state);
        }
        state.auditing = true;
        drop(state);

        ExclusiveTicket {
            gate: Arc::clone(self),
        }
    }

    /// Reserve and immediately run an exclusive visit
    pub fn exclusive<R>(self: &Arc<Self>, visit: impl FnOnce() -> R) -> R {
        self.reserve_exclusive().run(visit)
    }

    pub fn in_use(&self) -> usize {
        self.state.lock().in_use
    }

    pub fn is_auditing(&self) -> bool {
        self.state.lock().auditing
    }

    fn release_slot(&self) {
        let mut state = self.state.lock();
        state.in_use -= 1;
        let drained = state.in_use == 0;
        drop(state);

        if drained {
            self.changed.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut state = self.state.lock();
        while state.in_use > 0 {
            self.changed.wait(&mut state);
        }
    }

    fn clear_exclusive(&self) {
        self.state.lock().auditing = false;
        self.changed.notify_all();
    }
}

/// Proof that an ordinary operation is in progress
///
/// Dropping it is `endOperation`.
#[derive(Debug)]
#[must_use = "dropping the guard ends the operation immediately"]
pub struct SlotGuard {
    gate: Arc<AuditGate>,
}

impl SlotGuard {
    /// End the operation explicitly
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.gate.release_slot();
    }
}

/// A pending exclusive audit
///
/// While the ticket exists no new slot can be acquired. Dropping it without
/// calling `run` lowers the flag again.
#[derive(Debug)]
#[must_use = "dropping the ticket cancels the exclusive reservation"]
pub struct ExclusiveTicket {
    gate: Arc<AuditGate>,
}

impl ExclusiveTicket {
    /// Wait for in-flight operations to drain, then run `visit` exclusively
    pub fn run<R>(self, visit: impl FnOnce() -> R) -> R {
        self.gate.wait_drained();
        visit()
        // `self` drops here and clears the flag, also if `visit` panics
    }
}

impl Drop for ExclusiveTicket {
    fn drop(&mut self) {
        self.gate.clear_exclusive();
    }
}
