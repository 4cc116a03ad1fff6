//! Transaction handlers
//!
//! This module implements the three operations that encode the locking
//! protocol against the account store:
//!
//! - **Deposit**: one account lock under a shared gate slot
//! - **Transfer**: two account locks, always taken in ascending id order,
//!   under a shared gate slot
//! - **Audit**: no account locks at all, under exclusive gate access
//!
//! Log lines are emitted after all locks and gate access are released so
//! logging never holds up other accounts.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use super::account_store::AccountStore;
use super::gate::SlotGuard;
use super::traits::{AccessMode, GateAccess, TransactionHandler};
use crate::config::ProcessingDelay;
use crate::types::{AccountId, AccountSnapshot, LedgerError, Transaction, TransactionKind};

/// Shared state every handler runs against
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub store: Arc<AccountStore>,
    pub audits: Arc<AuditLog>,
    pub delay: ProcessingDelay,
}

impl HandlerContext {
    pub fn new(store: Arc<AccountStore>, delay: ProcessingDelay) -> Self {
        Self {
            store,
            audits: Arc::new(AuditLog::default()),
            delay,
        }
    }
}

/// Result of a successfully handled transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Deposited {
        account: AccountId,
        amount: f64,
        balance: f64,
    },
    Transferred {
        sender: AccountId,
        receiver: AccountId,
        amount: f64,
    },
    Audited(AuditReport),
}

/// Balances observed by one audit
#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    /// One line per account, sorted by id
    pub lines: Vec<AccountSnapshot>,
    pub total: f64,
}

impl AuditReport {
    pub fn balance_of(&self, id: AccountId) -> Option<f64> {
        self.lines
            .iter()
            .find(|line| line.id == id)
            .map(|line| line.balance)
    }
}

/// Every audit report produced during a run, in completion order
#[derive(Debug, Default)]
pub struct AuditLog {
    reports: Mutex<Vec<AuditReport>>,
}

impl AuditLog {
    pub fn record(&self, report: AuditReport) {
        self.reports.lock().push(report);
    }

    pub fn reports(&self) -> Vec<AuditReport> {
        self.reports.lock().clone()
    }

    pub fn last(&self) -> Option<AuditReport> {
        self.reports.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

static DEPOSIT: DepositHandler = DepositHandler;
static TRANSFER: TransferHandler = TransferHandler;
static AUDIT: AuditHandler = AuditHandler;

/// The handler responsible for a transaction kind
pub fn handler_for(kind: TransactionKind) -> &'static dyn TransactionHandler {
    match kind {
        TransactionKind::Deposit => &DEPOSIT,
        TransactionKind::Transfer => &TRANSFER,
        TransactionKind::Audit => &AUDIT,
    }
}

/// Reserve gate access and handle a transaction on the calling thread
pub fn execute(ctx: &HandlerContext, tx: &Transaction) -> Result<Outcome, LedgerError> {
    let handler = handler_for(tx.kind);
    let access = handler.reserve(&ctx.store);
    handler.handle(ctx, Some(tx), access)
}

fn shared_slot(
    handler: &dyn TransactionHandler,
    access: GateAccess,
) -> Result<SlotGuard, LedgerError> {
    match access {
        GateAccess::Shared(slot) => Ok(slot),
        other => Err(LedgerError::access_mismatch(
            handler.name(),
            AccessMode::Shared.as_str(),
            other.mode().as_str(),
        )),
    }
}

/// Applies a signed amount to one account
///
/// No funds check: withdrawals may take a balance below zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepositHandler;

impl TransactionHandler for DepositHandler {
    fn name(&self) -> &'static str {
        "deposit"
    }

    fn access_mode(&self) -> AccessMode {
        AccessMode::Shared
    }

    fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<&Transaction>,
        access: GateAccess,
    ) -> Result<Outcome, LedgerError> {
        let slot = shared_slot(self, access)?;
        let tx = payload.ok_or_else(|| LedgerError::missing_payload(self.name()))?;
        let account = ctx
            .store
            .lookup(tx.account_id)
            .ok_or_else(|| LedgerError::account_not_found(tx.account_id))?;

        ctx.delay.wait();
        let balance = {
            let mut balance = account.lock();
            *balance += tx.amount;
            *balance
        };
        ctx.store.end_operation(slot);

        if tx.amount < 0.0 {
            info!("Withdrew {:.2} from {}", -tx.amount, account.name());
        } else {
            info!("Deposited {:.2} to {}", tx.amount, account.name());
        }

        Ok(Outcome::Deposited {
            account: account.id(),
            amount: tx.amount,
            balance,
        })
    }
}

/// Moves a signed amount between two distinct accounts
///
/// Locks are always taken lowest id first. When the sender has the higher
/// id the roles are swapped and the amount negated, which leaves the net
/// effect unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferHandler;

impl TransactionHandler for TransferHandler {
    fn name(&self) -> &'static str {
        "transfer"
    }

    fn access_mode(&self) -> AccessMode {
        AccessMode::Shared
    }

    fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<&Transaction>,
        access: GateAccess,
    ) -> Result<Outcome, LedgerError> {
        let slot = shared_slot(self, access)?;
        let tx = payload.ok_or_else(|| LedgerError::missing_payload(self.name()))?;
        let receiver_id = tx
            .receiver_id
            .ok_or_else(|| LedgerError::missing_receiver(tx.account_id))?;
        if receiver_id == tx.account_id {
            return Err(LedgerError::self_transfer(receiver_id));
        }

        let sender = ctx
            .store
            .lookup(tx.account_id)
            .ok_or_else(|| LedgerError::account_not_found(tx.account_id))?;
        let receiver = ctx
            .store
            .lookup(receiver_id)
            .ok_or_else(|| LedgerError::account_not_found(receiver_id))?;

        let (first, second, amount) = if sender.id() < receiver.id() {
            (&sender, &receiver, tx.amount)
        } else {
            (&receiver, &sender, -tx.amount)
        };

        ctx.delay.wait();
        {
            let mut first_balance = first.lock();
            let mut second_balance = second.lock();
            *first_balance -= amount;
            *second_balance += amount;
        }
        ctx.store.end_operation(slot);

        info!(
            "Transferred {:.2} from {} to {}",
            tx.amount,
            sender.name(),
            receiver.name()
        );

        Ok(Outcome::Transferred {
            sender: sender.id(),
            receiver: receiver.id(),
            amount: tx.amount,
        })
    }
}

/// Reads every balance with all mutators excluded and reports the total
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditHandler;

impl TransactionHandler for AuditHandler {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn access_mode(&self) -> AccessMode {
        AccessMode::Exclusive
    }

    fn handle(
        &self,
        ctx: &HandlerContext,
        _payload: Option<&Transaction>,
        access: GateAccess,
    ) -> Result<Outcome, LedgerError> {
        let ticket = match access {
            GateAccess::Exclusive(ticket) => ticket,
            other => {
                return Err(LedgerError::access_mismatch(
                    self.name(),
                    AccessMode::Exclusive.as_str(),
                    other.mode().as_str(),
                ))
            }
        };

        let mut lines = Vec::with_capacity(ctx.store.len());
        let mut violation = None;
        ctx.store.audit_with(ticket, |account| {
            match account.read_exclusive() {
                Ok(balance) => lines.push(AccountSnapshot {
                    id: account.id(),
                    name: account.name().to_string(),
                    balance,
                }),
                Err(e) => {
                    violation.get_or_insert(e);
                }
            }
        });
        if let Some(e) = violation {
            return Err(e);
        }

        lines.sort_by_key(|line| line.id);
        let total = lines.iter().map(|line| line.balance).sum();
        let report = AuditReport { lines, total };

        for line in &report.lines {
            info!("{} (id {}): balance {:.2}", line.name, line.id, line.balance);
        }
        info!("Total balance: {:.2}", report.total);

        ctx.audits.record(report.clone());
        Ok(Outcome::Audited(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn context(accounts: u32, balance: f64) -> HandlerContext {
        HandlerContext::new(
            Arc::new(AccountStore::with_accounts(accounts, balance)),
            ProcessingDelay::NONE,
        )
    }

    #[rstest]
    #[case::deposit(TransactionKind::Deposit, "deposit", AccessMode::Shared)]
    #[case::transfer(TransactionKind::Transfer, "transfer", AccessMode::Shared)]
    #[case::audit(TransactionKind::Audit, "audit", AccessMode::Exclusive)]
    fn test_handler_for_kind(
        #[case] kind: TransactionKind,
        #[case] name: &str,
        #[case] mode: AccessMode,
    ) {
        let handler = handler_for(kind);

        assert_eq!(handler.name(), name);
        assert_eq!(handler.access_mode(), mode);
    }

    #[rstest]
    #[case::deposit(100.0, 1100.0)]
    #[case::withdrawal(-250.0, 750.0)]
    #[case::overdraw(-1500.0, -500.0)]
    fn test_deposit_applies_signed_amount(#[case] amount: f64, #[case] expected: f64) {
        let ctx = context(1, 1000.0);

        let outcome = execute(&ctx, &Transaction::deposit(0, amount)).unwrap();

        assert_eq!(
            outcome,
            Outcome::Deposited {
                account: 0,
                amount,
                balance: expected
            }
        );
        assert_eq!(ctx.store.lookup(0).unwrap().balance(), expected);
        assert_eq!(ctx.store.gate().in_use(), 0);
    }

    #[test]
    fn test_deposit_unknown_account_is_not_found() {
        let ctx = context(2, 0.0);

        let result = execute(&ctx, &Transaction::deposit(7, 10.0));

        assert_eq!(result, Err(LedgerError::AccountNotFound { id: 7 }));
        assert_eq!(ctx.store.gate().in_use(), 0);
    }

    #[rstest]
    #[case::ascending(1, 2, 50.0, [1000.0, 950.0, 1050.0])]
    #[case::descending(2, 1, 50.0, [1000.0, 1050.0, 950.0])]
    #[case::negative_amount(1, 2, -50.0, [1000.0, 1050.0, 950.0])]
    fn test_transfer_moves_funds(
        #[case] sender: AccountId,
        #[case] receiver: AccountId,
        #[case] amount: f64,
        #[case] expected: [f64; 3],
    ) {
        let ctx = context(3, 1000.0);

        execute(&ctx, &Transaction::transfer(sender, receiver, amount)).unwrap();

        for (id, balance) in expected.iter().enumerate() {
            assert_eq!(ctx.store.lookup(id as AccountId).unwrap().balance(), *balance);
        }
        assert_eq!(ctx.store.total_balance(), 3000.0);
    }

    #[test]
    fn test_transfer_from_higher_id_swaps_lock_order() {
        let store = AccountStore::new();
        store.create(2, "B", 1000.0);
        store.create(5, "A", 1000.0);
        let ctx = HandlerContext::new(Arc::new(store), ProcessingDelay::NONE);

        // Hold the lower id's lock: a handler that locks A first would take
        // A and then wait for B, so A being free proves B is taken first.
        let b = ctx.store.lookup(2).unwrap();
        let a = ctx.store.lookup(5).unwrap();
        let guard = b.lock();
        let worker = {
            let ctx = ctx.clone();
            thread::spawn(move || execute(&ctx, &Transaction::transfer(5, 2, 100.0)))
        };
        thread::sleep(Duration::from_millis(30));
        assert!(a.read_exclusive().is_ok(), "higher id locked before lower id");
        drop(guard);

        worker.join().unwrap().unwrap();
        assert_eq!(a.balance(), 900.0);
        assert_eq!(b.balance(), 1100.0);
    }

    #[rstest]
    #[case::self_transfer(Transaction::transfer(1, 1, 10.0), LedgerError::SelfTransfer { id: 1 })]
    #[case::missing_receiver(
        Transaction { receiver_id: None, ..Transaction::transfer(1, 2, 10.0) },
        LedgerError::MissingReceiver { id: 1 }
    )]
    #[case::unknown_sender(Transaction::transfer(9, 1, 10.0), LedgerError::AccountNotFound { id: 9 })]
    #[case::unknown_receiver(Transaction::transfer(1, 9, 10.0), LedgerError::AccountNotFound { id: 9 })]
    fn test_transfer_rejections(#[case] tx: Transaction, #[case] expected: LedgerError) {
        let ctx = context(3, 100.0);

        assert_eq!(execute(&ctx, &tx), Err(expected));
        assert_eq!(ctx.store.total_balance(), 300.0);
        assert_eq!(ctx.store.gate().in_use(), 0);
    }

    #[test]
    fn test_audit_reports_sorted_balances_and_total() {
        let ctx = context(3, 1000.0);
        execute(&ctx, &Transaction::deposit(0, 100.0)).unwrap();
        execute(&ctx, &Transaction::transfer(1, 2, 50.0)).unwrap();

        let outcome = execute(&ctx, &Transaction::audit()).unwrap();

        let Outcome::Audited(report) = outcome else {
            panic!("expected an audit outcome");
        };
        let balances: Vec<f64> = report.lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![1100.0, 950.0, 1050.0]);
        assert_eq!(report.total, 3100.0);
        assert_eq!(report.balance_of(2), Some(1050.0));
        assert_eq!(ctx.audits.last(), Some(report));
        assert!(!ctx.store.gate().is_auditing());
    }

    #[test]
    fn test_wrong_access_is_rejected_and_released() {
        let ctx = context(1, 0.0);

        let exclusive = GateAccess::Exclusive(ctx.store.reserve_audit());
        let result = DepositHandler.handle(&ctx, Some(&Transaction::deposit(0, 1.0)), exclusive);
        assert_eq!(
            result,
            Err(LedgerError::access_mismatch("deposit", "shared", "exclusive"))
        );
        assert!(!ctx.store.gate().is_auditing());

        let shared = GateAccess::Shared(ctx.store.begin_operation());
        let result = AuditHandler.handle(&ctx, None, shared);
        assert_eq!(
            result,
            Err(LedgerError::access_mismatch("audit", "exclusive", "shared"))
        );
        assert_eq!(ctx.store.gate().in_use(), 0);
    }

    #[test]
    fn test_missing_payload_is_rejected() {
        let ctx = context(1, 0.0);
        let access = DepositHandler.reserve(&ctx.store);

        assert_eq!(
            DepositHandler.handle(&ctx, None, access),
            Err(LedgerError::MissingPayload { handler: "deposit" })
        );
    }

    #[test]
    fn test_opposing_transfers_do_not_deadlock() {
        let ctx = context(2, 10_000.0);
        let (done_tx, done_rx) = mpsc::channel();

        for direction in 0..4 {
            let ctx = ctx.clone();
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let (from, to) = if direction % 2 == 0 { (0, 1) } else { (1, 0) };
                for _ in 0..500 {
                    execute(&ctx, &Transaction::transfer(from, to, 1.0)).unwrap();
                }
                done_tx.send(()).unwrap();
            });
        }

        for _ in 0..4 {
            done_rx
                .recv_timeout(Duration::from_secs(10))
                .expect("transfers deadlocked");
        }
        assert_eq!(ctx.store.total_balance(), 20_000.0);
        assert_eq!(ctx.store.lookup(0).unwrap().balance(), 10_000.0);
    }
}
