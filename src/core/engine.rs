//! Engine facade wiring the ledger together
//!
//! `TransactionEngine` owns the account store, the inbound transaction queue
//! and the audit log, and assembles a worker pool and dispatcher for a run.
//!
//! # Architecture
//!
//! ```text
//! producers ──> TransactionSubmitter ──> BlockingQueue<Transaction>
//!                                              │
//!                                          Dispatcher
//!                                              │ WorkItem + permit
//!                                          WorkerPool ──> handlers ──> AccountStore
//! ```

use std::sync::Arc;

use super::account_store::AccountStore;
use super::dispatcher::{DispatchSummary, Dispatcher};
use super::handlers::{AuditLog, AuditReport, HandlerContext};
use super::queue::BlockingQueue;
use super::worker_pool::WorkerPool;
use crate::config::EngineConfig;
use crate::types::{LedgerError, Transaction};

/// Cloneable handle producers use to feed the engine
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
    queue: Arc<BlockingQueue<Transaction>>,
}

impl TransactionSubmitter {
    /// Append a transaction to the inbound queue; never blocks
    pub fn submit_transaction(&self, tx: Transaction) {
        self.queue.enqueue(tx);
    }

    /// Signal that no more transactions will be submitted
    pub fn close(&self) {
        self.queue.close();
    }

    /// Whether the inbound queue was closed, by a producer or by the dispatcher
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Transactions waiting for the dispatcher
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Concurrent transaction-processing engine
#[derive(Debug)]
pub struct TransactionEngine {
    config: EngineConfig,
    store: Arc<AccountStore>,
    inbound: Arc<BlockingQueue<Transaction>>,
    audits: Arc<AuditLog>,
}

impl TransactionEngine {
    /// Create an engine with `config.accounts` accounts at the starting balance
    pub fn new(config: EngineConfig) -> Result<Self, LedgerError> {
        let config = config.sanitized();
        let store = AccountStore::with_accounts(config.accounts, config.starting_balance);
        Self::with_store(config, store)
    }

    /// Create an engine over an existing set of accounts
    pub fn with_store(config: EngineConfig, store: AccountStore) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            config,
            store: Arc::new(store),
            inbound: Arc::new(BlockingQueue::new()),
            audits: Arc::new(AuditLog::default()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn submitter(&self) -> TransactionSubmitter {
        TransactionSubmitter {
            queue: Arc::clone(&self.inbound),
        }
    }

    /// Every audit report recorded so far, in completion order
    pub fn audits(&self) -> Vec<AuditReport> {
        self.audits.reports()
    }

    /// Start the workers and dispatch on the calling thread until shutdown
    ///
    /// The run ends when the transaction budget is reached or, without a
    /// budget, when every producer has closed the inbound queue. The inbound
    /// queue stays closed afterwards, so an engine runs once.
    pub fn run(&self) -> Result<DispatchSummary, LedgerError> {
        let ctx = HandlerContext {
            store: Arc::clone(&self.store),
            audits: Arc::clone(&self.audits),
            delay: self.config.delay,
        };
        let pool = WorkerPool::start(self.config.workers, self.config.max_in_flight, ctx)?;

        Dispatcher::new(
            Arc::clone(&self.inbound),
            pool,
            self.config.transaction_limit,
            self.config.audit_interval,
        )
        .run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingDelay;
    use std::thread;

    fn config(workers: usize, accounts: u32) -> EngineConfig {
        EngineConfig {
            workers,
            max_in_flight: workers,
            accounts,
            delay: ProcessingDelay::NONE,
            transaction_limit: None,
            audit_interval: 0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_new_creates_configured_accounts() {
        let engine = TransactionEngine::new(config(2, 4)).unwrap();

        assert_eq!(engine.store().len(), 4);
        assert_eq!(engine.store().total_balance(), 4000.0);
    }

    #[test]
    fn test_with_store_rejects_invalid_config() {
        let bad = EngineConfig {
            starting_balance: f64::INFINITY,
            ..config(1, 1)
        };

        assert!(TransactionEngine::with_store(bad, AccountStore::new()).is_err());
    }

    #[test]
    fn test_run_processes_submitted_transactions() {
        let engine = TransactionEngine::new(config(3, 3)).unwrap();
        let submitter = engine.submitter();

        submitter.submit_transaction(Transaction::deposit(0, 100.0));
        submitter.submit_transaction(Transaction::transfer(1, 2, 50.0));
        submitter.submit_transaction(Transaction::audit());
        assert_eq!(submitter.pending(), 3);
        submitter.close();

        let summary = engine.run().unwrap();

        assert_eq!(summary.dispatched, 2);
        let audits = engine.audits();
        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].total, 3100.0);
        assert_eq!(audits[0].balance_of(1), Some(950.0));
    }

    #[test]
    fn test_concurrent_producers() {
        let engine = TransactionEngine::new(config(4, 5)).unwrap();
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let submitter = engine.submitter();
                thread::spawn(move || {
                    for i in 0..50u32 {
                        submitter.submit_transaction(Transaction::deposit((p + i) % 5, 2.0));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        engine.submitter().close();

        let summary = engine.run().unwrap();

        assert_eq!(summary.dispatched, 200);
        assert_eq!(summary.final_audit.unwrap().total, 5400.0);
    }
}
