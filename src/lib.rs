//! Concurrent Ledger Library
//! # Overview
//!
//! This library runs deposits, transfers and balance audits concurrently
//! against an in-memory ledger. Ordinary operations run in parallel under
//! per-account locks, while an audit drains all in-flight work and reads every
//! balance with exclusive access.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, LedgerError)
//! - [`config`] - Engine configuration and simulated processing delay
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Concurrency machinery:
//!   - [`core::queue`] - Blocking FIFO queue
//!   - [`core::gate`] - Drain barrier between operations and audits
//!   - [`core::account_store`] - Concurrent account map with the audit barrier
//!   - [`core::handlers`] - Deposit, transfer and audit handlers
//!   - [`core::worker_pool`] - Fixed pool of worker threads with admission control
//!   - [`core::dispatcher`] - Feeds the pool, injects audits, drives shutdown
//!   - [`core::engine`] - Facade wiring a run together
//! - [`producer`] - Transaction sources (random generation, CSV replay)
//! - [`io`] - CSV replay input and balance output
//!
//! # Transaction Types
//!
//! - **Deposit**: Add a signed amount to one account (negative is a withdrawal)
//! - **Transfer**: Move a signed amount between two distinct accounts
//! - **Audit**: Read every balance and the total at a consistent point
//!
//! Balances may go negative; there is no funds check.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod producer;
pub mod types;

pub use crate::config::{EngineConfig, ProcessingDelay};
pub use crate::core::{
    AccountStore, AuditReport, DispatchSummary, TransactionEngine, TransactionSubmitter,
};
pub use io::write_balances_csv;
pub use producer::{create_producer, Producer, ProducerType};
pub use types::{Account, AccountId, AccountSnapshot, LedgerError, Transaction, TransactionKind};
