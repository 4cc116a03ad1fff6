//! Core traits for transaction handlers
//!
//! Each transaction kind has exactly one handler. A handler declares which
//! kind of gate access it needs, so the dispatcher can reserve that access
//! when it submits the work item, and then performs the operation when a
//! worker executes it.

use std::fmt;

use super::account_store::AccountStore;
use super::gate::{ExclusiveTicket, SlotGuard};
use super::handlers::{HandlerContext, Outcome};
use crate::types::{LedgerError, Transaction};

/// Kind of access a handler needs on the store's audit gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// An ordinary operation alongside others
    Shared,
    /// Sole access to every account
    Exclusive,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Shared => "shared",
            AccessMode::Exclusive => "exclusive",
        }
    }
}

/// Gate access reserved for one work item
///
/// Dropping it releases the reservation.
#[derive(Debug)]
pub enum GateAccess {
    Shared(SlotGuard),
    Exclusive(ExclusiveTicket),
}

impl GateAccess {
    pub fn mode(&self) -> AccessMode {
        match self {
            GateAccess::Shared(_) => AccessMode::Shared,
            GateAccess::Exclusive(_) => AccessMode::Exclusive,
        }
    }
}

/// A handler for one transaction kind
pub trait TransactionHandler: fmt::Debug + Send + Sync {
    /// Short name used in log lines and errors
    fn name(&self) -> &'static str;

    /// Gate access this handler runs under
    fn access_mode(&self) -> AccessMode;

    /// Reserve the gate access for one execution
    ///
    /// Blocks while an audit is pending (shared) or while another audit is
    /// outstanding (exclusive).
    fn reserve(&self, store: &AccountStore) -> GateAccess {
        match self.access_mode() {
            AccessMode::Shared => GateAccess::Shared(store.begin_operation()),
            AccessMode::Exclusive => GateAccess::Exclusive(store.reserve_audit()),
        }
    }

    /// Perform the operation under previously reserved access
    ///
    /// The access is released before this returns, on every path.
    fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<&Transaction>,
        access: GateAccess,
    ) -> Result<Outcome, LedgerError>;
}
