//! Transaction dispatcher
//!
//! The `Dispatcher` is the single coordinating routine between the inbound
//! transaction queue and the worker pool.
//!
//! # States
//!
//! ```text
//! Running ──(budget reached or inbound closed)──> Draining ──> Shutdown
//! ```
//!
//! While running, each iteration waits for an admission permit and for a
//! transaction (both must be available), reserves the gate access the
//! transaction's handler needs, and submits the work item. Reserving at
//! dispatch time fixes every audit's position in the stream: it sees exactly
//! the deposits and transfers dispatched before it.
//!
//! Every `audit_interval` counted transactions an audit is submitted right
//! behind the transaction that completed the interval, so it reports the
//! ledger at that point in the stream. Audits never count against the
//! transaction budget.
//!
//! Draining closes the inbound queue, submits one final audit and shuts the
//! pool down. The pool finishes everything already queued before its
//! workers exit, so the final audit always runs.

use std::sync::Arc;
use tracing::{debug, info};

use super::account_store::AccountStore;
use super::handlers::AuditReport;
use super::queue::BlockingQueue;
use super::worker_pool::{PoolStats, WorkItem, WorkerPool};
use crate::types::{LedgerError, Transaction};

/// Lifecycle of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Running,
    Draining,
    Shutdown,
}

/// What a completed dispatcher run did
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSummary {
    /// Deposits and transfers handed to the pool
    pub dispatched: u64,
    /// Audits handed to the pool, including the final one
    pub audits_dispatched: u64,
    /// Worker pool counters after shutdown
    pub pool: PoolStats,
    /// Report of the final audit, if it succeeded
    pub final_audit: Option<AuditReport>,
}

/// Drives transactions from the inbound queue into the worker pool
#[derive(Debug)]
pub struct Dispatcher {
    inbound: Arc<BlockingQueue<Transaction>>,
    pool: WorkerPool,
    store: Arc<AccountStore>,
    transaction_limit: Option<u64>,
    audit_interval: u64,
    state: DispatcherState,
    dispatched: u64,
    audits_dispatched: u64,
}

impl Dispatcher {
    /// Create a dispatcher feeding `pool` from `inbound`
    ///
    /// `transaction_limit` of `None` keeps running until the inbound queue
    /// is closed and empty. An `audit_interval` of zero disables periodic
    /// audits.
    pub fn new(
        inbound: Arc<BlockingQueue<Transaction>>,
        pool: WorkerPool,
        transaction_limit: Option<u64>,
        audit_interval: u64,
    ) -> Self {
        let store = Arc::clone(&pool.context().store);
        Self {
            inbound,
            pool,
            store,
            transaction_limit,
            audit_interval,
            state: DispatcherState::Running,
            dispatched: 0,
            audits_dispatched: 0,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Dispatch until the budget is reached or producers are done, then shut down
    pub fn run(mut self) -> Result<DispatchSummary, LedgerError> {
        info!(limit = ?self.transaction_limit, "Dispatcher running");

        while !self.budget_reached() {
            let permit = self.pool.admit();
            let Some(tx) = self.inbound.dequeue() else {
                info!("Inbound queue closed, no more transactions");
                break;
            };

            debug!("Dispatching {}", tx);
            let counted = !tx.is_audit();
            let item = WorkItem::reserve(&self.store, tx);
            self.pool.submit(item, permit)?;

            if counted {
                self.dispatched += 1;
                if self.audit_interval > 0 && self.dispatched % self.audit_interval == 0 {
                    self.submit_audit()?;
                }
            } else {
                self.audits_dispatched += 1;
            }
        }

        self.drain()
    }

    fn budget_reached(&self) -> bool {
        self.transaction_limit
            .is_some_and(|limit| self.dispatched >= limit)
    }

    fn submit_audit(&mut self) -> Result<(), LedgerError> {
        let permit = self.pool.admit();
        self.pool
            .submit(WorkItem::reserve_audit(&self.store), permit)?;
        self.audits_dispatched += 1;
        Ok(())
    }

    fn drain(mut self) -> Result<DispatchSummary, LedgerError> {
        self.state = DispatcherState::Draining;
        info!(
            dispatched = self.dispatched,
            "Dispatcher draining, injecting final audit"
        );
        self.inbound.close();
        self.submit_audit()?;

        let audits = Arc::clone(&self.pool.context().audits);
        let pool = self.pool.shutdown();
        self.state = DispatcherState::Shutdown;
        info!(
            dispatched = self.dispatched,
            audits = self.audits_dispatched,
            "Dispatcher shut down"
        );

        Ok(DispatchSummary {
            dispatched: self.dispatched,
            audits_dispatched: self.audits_dispatched,
            pool,
            final_audit: audits.last(),
        })
    }
}
