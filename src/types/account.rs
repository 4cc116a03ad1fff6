//! Account-related types for the concurrent ledger
//!
//! This module defines the Account structure shared by every worker. The
//! identifier and display name are fixed at creation; only the balance is
//! mutable, and only through the account's own lock.

use parking_lot::{Mutex, MutexGuard};

use super::error::LedgerError;

/// Account identifier
///
/// Account identifiers also define the global lock order for transfers:
/// the lower identifier is always locked first.
pub type AccountId = u32;

/// Ledger account
///
/// Accounts are created once at startup and shared behind `Arc` by the
/// account store. The balance is a floating-point value guarded by a
/// per-account mutex so operations on different accounts never contend.
#[derive(Debug)]
pub struct Account {
    /// Unique identifier, immutable after creation
    id: AccountId,

    /// Human-readable display name, immutable after creation
    name: String,

    /// Current balance
    ///
    /// Negative balances are allowed: withdrawals are never checked for funds.
    balance: Mutex<f64>,
}

impl Account {
    /// Create a new account with the given starting balance
    pub fn new(id: AccountId, name: impl Into<String>, starting_balance: f64) -> Self {
        Self {
            id,
            name: name.into(),
            balance: Mutex::new(starting_balance),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire this account's exclusive lock
    ///
    /// The returned guard derefs to the balance. Callers that need two
    /// accounts must go through the transfer handler, which enforces the
    /// ascending-id lock order.
    pub fn lock(&self) -> MutexGuard<'_, f64> {
        self.balance.lock()
    }

    /// Read the current balance, taking the account lock briefly
    pub fn balance(&self) -> f64 {
        *self.balance.lock()
    }

    /// Read the balance without waiting for the account lock
    ///
    /// Used by audits, which already hold exclusive access to the whole
    /// store through the audit gate. If some mutator still holds this
    /// account's lock the gate has been bypassed, and that is reported as a
    /// `BarrierViolation` instead of blocking.
    pub fn read_exclusive(&self) -> Result<f64, LedgerError> {
        self.balance
            .try_lock()
            .map(|balance| *balance)
            .ok_or_else(|| LedgerError::barrier_violation(self.id))
    }
}

/// Point-in-time copy of an account, as recorded by an audit
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub name: String,
    pub balance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_keeps_identity_and_balance() {
        let account = Account::new(7, "Account 7", 1000.0);

        assert_eq!(account.id(), 7);
        assert_eq!(account.name(), "Account 7");
        assert_eq!(account.balance(), 1000.0);
    }

    #[test]
    fn test_lock_allows_mutation() {
        let account = Account::new(1, "Account 1", 10.0);

        {
            let mut balance = account.lock();
            *balance -= 25.0;
        }

        // Negative balances are permitted
        assert_eq!(account.balance(), -15.0);
    }

    #[test]
    fn test_read_exclusive_succeeds_when_unlocked() {
        let account = Account::new(1, "Account 1", 42.5);

        assert_eq!(account.read_exclusive(), Ok(42.5));
    }

    #[test]
    fn test_read_exclusive_reports_held_lock() {
        let account = Account::new(3, "Account 3", 1.0);
        let _guard = account.lock();

        assert_eq!(
            account.read_exclusive(),
            Err(LedgerError::BarrierViolation { id: 3 })
        );
    }
}
