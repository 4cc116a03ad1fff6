//! Concurrent account store with a store-wide audit barrier
//!
//! This module provides the `AccountStore`, which owns every account and the
//! `AuditGate` that coordinates ordinary operations with audits.
//!
//! # Design
//!
//! Accounts live in a `DashMap` keyed by id and are shared as `Arc<Account>`,
//! so a lookup only touches the map structure and never a balance. Lookups
//! therefore ignore the barrier and are safe during an audit.
//!
//! Per-account locks alone cannot produce a consistent snapshot of the whole
//! ledger, because other accounts can change between two reads. Mutators
//! therefore also hold a shared slot of the gate (`begin_operation`), and an
//! audit (`run_audit`) takes the gate exclusively: new operations are held
//! back, in-flight ones drain, and then every account is visited.

use dashmap::DashMap;
use std::sync::Arc;

use super::gate::{AuditGate, ExclusiveTicket, SlotGuard};
use crate::types::{Account, AccountId};

/// Thread-safe store of all ledger accounts
#[derive(Debug)]
pub struct AccountStore {
    /// Accounts by id; populated at startup and never shrunk
    accounts: DashMap<AccountId, Arc<Account>>,

    /// Drain barrier shared by every operation on this store
    gate: Arc<AuditGate>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            gate: Arc::new(AuditGate::new()),
        }
    }

    /// Create a store with accounts `0..count`, each named `Account {id}`
    pub fn with_accounts(count: u32, starting_balance: f64) -> Self {
        let store = Self::new();
        for id in 0..count {
            store.create(id, format!("Account {}", id), starting_balance);
        }
        store
    }

    /// Insert a new account
    ///
    /// Returns `false` and leaves the existing account untouched if the id is
    /// already present.
    pub fn create(&self, id: AccountId, name: impl Into<String>, starting_balance: f64) -> bool {
        let mut inserted = false;
        self.accounts.entry(id).or_insert_with(|| {
            inserted = true;
            Arc::new(Account::new(id, name, starting_balance))
        });
        inserted
    }

    /// Find an account by id
    ///
    /// Does not wait on the audit barrier.
    pub fn lookup(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Begin an ordinary operation, blocking while an audit is pending
    ///
    /// The operation ends when the returned guard is dropped.
    pub fn begin_operation(&self) -> SlotGuard {
        self.gate.acquire_slot()
    }

    /// End an ordinary operation
    pub fn end_operation(&self, slot: SlotGuard) {
        slot.release();
    }

    /// Stop new operations now and return a ticket to audit later
    pub fn reserve_audit(&self) -> ExclusiveTicket {
        self.gate.reserve_exclusive()
    }

    /// Visit every account with no mutator running
    ///
    /// Accounts are visited in arbitrary order.
    pub fn run_audit(&self, visit: impl FnMut(&Account)) {
        let ticket = self.reserve_audit();
        self.audit_with(ticket, visit);
    }

    /// Run an audit that was reserved earlier with `reserve_audit`
    pub fn audit_with(&self, ticket: ExclusiveTicket, mut visit: impl FnMut(&Account)) {
        ticket.run(|| {
            for entry in self.accounts.iter() {
                visit(entry.value());
            }
        });
    }

    /// The store's audit barrier
    pub fn gate(&self) -> &Arc<AuditGate> {
        &self.gate
    }

    /// Sum of all balances, taking each account lock in turn
    ///
    /// Not a consistent snapshot while mutators run; intended for use after
    /// the workers have stopped.
    pub fn total_balance(&self) -> f64 {
        self.accounts
            .iter()
            .map(|entry| entry.value().balance())
            .sum()
    }

    /// All accounts sorted by id
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        let mut accounts: Vec<Arc<Account>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        accounts.sort_by_key(|account| account.id());
        accounts
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_with_accounts_creates_named_accounts() {
        let store = AccountStore::with_accounts(3, 1000.0);

        assert_eq!(store.len(), 3);
        let account = store.lookup(2).unwrap();
        assert_eq!(account.name(), "Account 2");
        assert_eq!(account.balance(), 1000.0);
        assert_eq!(store.total_balance(), 3000.0);
    }

    #[test]
    fn test_create_does_not_overwrite() {
        let store = AccountStore::new();

        assert!(store.create(1, "first", 10.0));
        assert!(!store.create(1, "second", 99.0));

        let account = store.lookup(1).unwrap();
        assert_eq!(account.name(), "first");
        assert_eq!(account.balance(), 10.0);
    }

    #[test]
    fn test_lookup_unknown_returns_none() {
        let store = AccountStore::with_accounts(2, 0.0);

        assert!(store.lookup(5).is_none());
    }

    #[test]
    fn test_lookup_works_while_audit_pending() {
        let store = AccountStore::with_accounts(2, 0.0);
        let ticket = store.reserve_audit();

        assert!(store.lookup(1).is_some());

        store.audit_with(ticket, |_| ());
        assert!(!store.gate().is_auditing());
    }

    #[test]
    fn test_run_audit_visits_every_account_once() {
        let store = AccountStore::with_accounts(5, 1.0);
        let mut seen = Vec::new();

        store.run_audit(|account| seen.push(account.id()));

        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_begin_end_operation_balances_counter() {
        let store = AccountStore::with_accounts(1, 0.0);

        let slot = store.begin_operation();
        assert_eq!(store.gate().in_use(), 1);
        store.end_operation(slot);
        assert_eq!(store.gate().in_use(), 0);
    }

    #[test]
    fn test_audit_waits_for_running_operation() {
        let store = Arc::new(AccountStore::with_accounts(2, 100.0));
        let slot = store.begin_operation();
        let audited = Arc::new(AtomicBool::new(false));

        let auditor = {
            let store = Arc::clone(&store);
            let audited = Arc::clone(&audited);
            thread::spawn(move || {
                let mut total = 0.0;
                store.run_audit(|account| total += account.read_exclusive().unwrap());
                audited.store(true, Ordering::SeqCst);
                total
            })
        };

        // The operation still running mutates an account
        thread::sleep(Duration::from_millis(20));
        *store.lookup(0).unwrap().lock() += 50.0;
        assert!(!audited.load(Ordering::SeqCst));
        store.end_operation(slot);

        assert_eq!(auditor.join().unwrap(), 250.0);
    }

    #[test]
    fn test_accounts_sorted_by_id() {
        let store = AccountStore::new();
        store.create(9, "nine", 0.0);
        store.create(1, "one", 0.0);
        store.create(4, "four", 0.0);

        let ids: Vec<AccountId> = store.accounts().iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec![1, 4, 9]);
    }
}
