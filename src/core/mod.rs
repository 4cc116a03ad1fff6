//! Core concurrency components
//!
//! This module contains the transaction-processing machinery:
//! - `queue` - Blocking FIFO used for inbound transactions and work items
//! - `gate` - Drain barrier between ordinary operations and audits
//! - `admission` - Counting permits bounding in-flight work
//! - `account_store` - Concurrent account map with the audit barrier
//! - `traits` - Handler abstraction and gate access modes
//! - `handlers` - Deposit, transfer and audit handlers
//! - `worker_pool` - Fixed set of worker threads
//! - `dispatcher` - Feeds the pool, injects audits, drives shutdown
//! - `engine` - Facade wiring everything for a run

pub mod account_store;
pub mod admission;
pub mod dispatcher;
pub mod engine;
pub mod gate;
pub mod handlers;
pub mod queue;
pub mod traits;
pub mod worker_pool;

pub use account_store::AccountStore;
pub use dispatcher::{DispatchSummary, Dispatcher, DispatcherState};
pub use engine::{TransactionEngine, TransactionSubmitter};
pub use gate::AuditGate;
pub use handlers::{AuditReport, HandlerContext, Outcome};
pub use queue::BlockingQueue;
pub use traits::TransactionHandler;
pub use worker_pool::{PoolStats, WorkItem, WorkerPool};
