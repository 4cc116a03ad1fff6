//! Transaction-related types for the concurrent ledger
//!
//! This module defines the transaction kinds and the transaction record that
//! producers submit and handlers consume.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountId;

/// Transaction kinds supported by the ledger
///
/// Each kind maps to exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Apply a signed amount to one account
    ///
    /// A positive amount is a deposit, a negative amount a withdrawal.
    Deposit,

    /// Move a signed amount from one account to another
    ///
    /// A negative amount moves funds in the reverse direction.
    Transfer,

    /// Read every balance under exclusive access and report the total
    Audit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Audit => "audit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work submitted to the ledger
///
/// Transactions are immutable once created and are consumed exactly once
/// by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The account the transaction applies to (the sender for transfers)
    ///
    /// Ignored for audits.
    pub account_id: AccountId,

    /// The receiving account, present for transfers only
    pub receiver_id: Option<AccountId>,

    /// The kind of transaction
    pub kind: TransactionKind,

    /// Signed amount; zero for audits
    pub amount: f64,
}

impl Transaction {
    /// Create a deposit (positive amount) or withdrawal (negative amount)
    pub fn deposit(account_id: AccountId, amount: f64) -> Self {
        Self {
            account_id,
            receiver_id: None,
            kind: TransactionKind::Deposit,
            amount,
        }
    }

    /// Create a transfer from `sender` to `receiver`
    pub fn transfer(sender: AccountId, receiver: AccountId, amount: f64) -> Self {
        Self {
            account_id: sender,
            receiver_id: Some(receiver),
            kind: TransactionKind::Transfer,
            amount,
        }
    }

    /// Create a balance audit
    pub fn audit() -> Self {
        Self {
            account_id: 0,
            receiver_id: None,
            kind: TransactionKind::Audit,
            amount: 0.0,
        }
    }

    pub fn is_audit(&self) -> bool {
        self.kind == TransactionKind::Audit
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.receiver_id) {
            (TransactionKind::Deposit, _) if self.amount < 0.0 => write!(
                f,
                "withdrawal of {:.2} from account {}",
                -self.amount, self.account_id
            ),
            (TransactionKind::Deposit, _) => write!(
                f,
                "deposit of {:.2} to account {}",
                self.amount, self.account_id
            ),
            (TransactionKind::Transfer, Some(receiver)) => write!(
                f,
                "transfer of {:.2} from account {} to account {}",
                self.amount, self.account_id, receiver
            ),
            (TransactionKind::Transfer, None) => write!(
                f,
                "transfer of {:.2} from account {} with no receiver",
                self.amount, self.account_id
            ),
            (TransactionKind::Audit, _) => f.write_str("balance audit"),
        }
    }
}
