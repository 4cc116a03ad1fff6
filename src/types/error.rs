//! Error types for the concurrent ledger
//!
//! This module defines all error types that can occur while processing
//! transactions or setting up the engine.
//!
//! # Error Categories
//!
//! - **Not-found**: a transaction references an unknown account. Recovered
//!   locally: the transaction is logged and discarded.
//! - **Invalid transaction**: a transfer without a receiver or to itself.
//! - **Protocol violation**: a work item reached a handler with the wrong
//!   gate access, or an audit found an account lock held.
//! - **Setup**: invalid configuration, file I/O and CSV parsing.

use thiserror::Error;

use super::account::AccountId;

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// A transaction referenced an account that does not exist
    ///
    /// This is a recoverable error - the transaction is discarded.
    #[error("Account {id} not found")]
    AccountNotFound {
        /// The unknown account identifier
        id: AccountId,
    },

    /// A transfer named the same account as sender and receiver
    #[error("Transfer from account {id} to itself rejected")]
    SelfTransfer {
        /// The account on both sides
        id: AccountId,
    },

    /// A transfer did not name a receiving account
    #[error("Transfer from account {id} has no receiver")]
    MissingReceiver {
        /// The sending account
        id: AccountId,
    },

    /// A handler was given gate access that does not match its mode
    #[error("Handler '{handler}' received {received} access, expected {expected}")]
    AccessMismatch {
        /// Name of the handler
        handler: &'static str,
        /// Access mode the handler requires
        expected: &'static str,
        /// Access mode that was reserved
        received: &'static str,
    },

    /// A handler that needs a transaction was executed without one
    #[error("Handler '{handler}' requires a transaction payload")]
    MissingPayload {
        /// Name of the handler
        handler: &'static str,
    },

    /// An audit found an account lock held while it had exclusive access
    #[error("Account {id} was locked during an exclusive audit")]
    BarrierViolation {
        /// The account whose lock was held
        id: AccountId,
    },

    /// Work was submitted after the worker pool began shutting down
    #[error("Worker pool is shut down")]
    PoolShutDown,

    /// A configuration value is unusable
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// Name of the configuration field
        field: String,
        /// Description of the problem
        message: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed record is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(id: AccountId) -> Self {
        LedgerError::AccountNotFound { id }
    }

    /// Create a SelfTransfer error
    pub fn self_transfer(id: AccountId) -> Self {
        LedgerError::SelfTransfer { id }
    }

    /// Create a MissingReceiver error
    pub fn missing_receiver(id: AccountId) -> Self {
        LedgerError::MissingReceiver { id }
    }

    /// Create an AccessMismatch error
    pub fn access_mismatch(
        handler: &'static str,
        expected: &'static str,
        received: &'static str,
    ) -> Self {
        LedgerError::AccessMismatch {
            handler,
            expected,
            received,
        }
    }

    /// Create a MissingPayload error
    pub fn missing_payload(handler: &'static str) -> Self {
        LedgerError::MissingPayload { handler }
    }

    /// Create a BarrierViolation error
    pub fn barrier_violation(id: AccountId) -> Self {
        LedgerError::BarrierViolation { id }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        LedgerError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Create a ParseError
    pub fn parse_error(line: Option<u64>, message: impl Into<String>) -> Self {
        LedgerError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Whether this error only discards a single transaction
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound { .. }
                | LedgerError::SelfTransfer { .. }
                | LedgerError::MissingReceiver { .. }
                | LedgerError::ParseError { .. }
        )
    }
}
