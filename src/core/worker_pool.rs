//! Fixed-size pool of long-lived worker threads
//!
//! This module provides the `WorkerPool`, which executes `WorkItem`s pulled
//! from an internal `BlockingQueue`.
//!
//! # Architecture
//!
//! ```text
//! WorkerPool
//!     ├── Arc<Admission>          (in-flight permits, taken by the submitter)
//!     └── Arc<PoolShared>
//!         ├── BlockingQueue<Job>  (work channel, closed on shutdown)
//!         ├── PoolState           (live / executing / shutdown)
//!         └── HandlerContext      (store, audit log, simulated delay)
//! ```
//!
//! # Worker lifecycle
//!
//! starting → idle (blocked in dequeue) → busy (executing) → idle → … →
//! stopped. A worker stops when the closed work queue reports "no more
//! work". Handler panics are caught and logged; the worker keeps running.
//!
//! # Backpressure
//!
//! Admission is decoupled from the thread count: the submitter takes an
//! `AdmissionPermit` before submitting and the worker drops it after the item
//! finished, so at most `max_in_flight` items are queued or executing.

use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::account_store::AccountStore;
use super::admission::{Admission, AdmissionPermit};
use super::handlers::{handler_for, HandlerContext, Outcome};
use super::queue::BlockingQueue;
use super::traits::{GateAccess, TransactionHandler};
use crate::types::{LedgerError, Transaction, TransactionKind};

/// A handler bound to at most one transaction, with its gate access reserved
#[derive(Debug)]
pub struct WorkItem {
    handler: &'static dyn TransactionHandler,
    payload: Option<Transaction>,
    access: GateAccess,
}

impl WorkItem {
    pub fn new(
        handler: &'static dyn TransactionHandler,
        payload: Option<Transaction>,
        access: GateAccess,
    ) -> Self {
        Self {
            handler,
            payload,
            access,
        }
    }

    /// Bind a transaction to its handler and reserve the handler's access
    ///
    /// Blocks while an audit is pending if the handler needs a shared slot.
    pub fn reserve(store: &AccountStore, tx: Transaction) -> Self {
        let handler = handler_for(tx.kind);
        let access = handler.reserve(store);
        Self::new(handler, Some(tx), access)
    }

    /// An audit with no transaction payload
    pub fn reserve_audit(store: &AccountStore) -> Self {
        let handler = handler_for(TransactionKind::Audit);
        let access = handler.reserve(store);
        Self::new(handler, None, access)
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    /// Execute the item, consuming it and its reservation
    pub fn run(self, ctx: &HandlerContext) -> Result<Outcome, LedgerError> {
        self.handler.handle(ctx, self.payload.as_ref(), self.access)
    }
}

/// A work item together with the permit it was admitted under
#[derive(Debug)]
struct Job {
    item: WorkItem,
    permit: AdmissionPermit,
}

#[derive(Debug, Default)]
struct PoolState {
    live: usize,
    executing: usize,
    peak_executing: usize,
    shutdown: bool,
}

#[derive(Debug)]
struct PoolShared {
    jobs: BlockingQueue<Job>,
    state: Mutex<PoolState>,
    state_changed: Condvar,
    completed: AtomicU64,
    failed: AtomicU64,
    ctx: HandlerContext,
}

impl PoolShared {
    fn begin_execution(&self) {
        let mut state = self.state.lock();
        state.executing += 1;
        state.peak_executing = state.peak_executing.max(state.executing);
    }

    fn end_execution(&self) {
        self.state.lock().executing -= 1;
        self.state_changed.notify_all();
    }

    fn worker_exited(&self) {
        self.state.lock().live -= 1;
        self.state_changed.notify_all();
    }
}

/// Counters describing a pool's work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Configured number of worker threads
    pub workers: usize,
    /// Items whose handler returned successfully
    pub completed: u64,
    /// Items whose handler returned an error or panicked
    pub failed: u64,
    /// Largest number of items executing at the same time
    pub peak_executing: usize,
    /// Admission requests that had to wait for a permit
    pub admission_waits: u64,
}

/// Pool of worker threads executing work items
#[derive(Debug)]
pub struct WorkerPool {
    workers: usize,
    admission: Arc<Admission>,
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` threads with room for `max_in_flight` admitted items
    pub fn start(
        workers: usize,
        max_in_flight: usize,
        ctx: HandlerContext,
    ) -> Result<Self, LedgerError> {
        if workers == 0 {
            return Err(LedgerError::invalid_config("workers", "must be positive"));
        }
        if max_in_flight == 0 {
            return Err(LedgerError::invalid_config(
                "max_in_flight",
                "must be positive",
            ));
        }

        let mut pool = Self {
            workers,
            admission: Admission::new(max_in_flight),
            shared: Arc::new(PoolShared {
                jobs: BlockingQueue::new(),
                state: Mutex::new(PoolState::default()),
                state_changed: Condvar::new(),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                ctx,
            }),
            handles: Vec::with_capacity(workers),
        };

        for id in 0..workers {
            pool.shared.state.lock().live += 1;
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("ledger-worker-{}", id))
                .spawn(move || worker_loop(id, shared));

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    pool.shared.worker_exited();
                    pool.stop();
                    return Err(e.into());
                }
            }
        }

        info!(workers, max_in_flight, "Worker pool started");
        Ok(pool)
    }

    /// Take an admission permit, blocking while the pool is at capacity
    pub fn admit(&self) -> AdmissionPermit {
        self.admission.acquire()
    }

    /// Queue a work item for execution; never blocks
    pub fn submit(&self, item: WorkItem, permit: AdmissionPermit) -> Result<(), LedgerError> {
        // Held across the enqueue so an accepted job is always seen by a worker
        let state = self.shared.state.lock();
        if state.shutdown {
            return Err(LedgerError::PoolShutDown);
        }
        self.shared.jobs.enqueue(Job { item, permit });
        drop(state);
        Ok(())
    }

    /// Admit and submit in one call
    pub fn admit_and_submit(&self, item: WorkItem) -> Result<(), LedgerError> {
        let permit = self.admit();
        self.submit(item, permit)
    }

    pub fn context(&self) -> &HandlerContext {
        &self.shared.ctx
    }

    pub fn live_workers(&self) -> usize {
        self.shared.state.lock().live
    }

    pub fn executing(&self) -> usize {
        self.shared.state.lock().executing
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers,
            completed: self.shared.completed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            peak_executing: self.shared.state.lock().peak_executing,
            admission_waits: self.admission.waits(),
        }
    }

    /// Stop accepting work, let the workers drain the queue, and wait for them
    pub fn shutdown(mut self) -> PoolStats {
        self.stop();
        let stats = self.stats();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            peak_executing = stats.peak_executing,
            "Worker pool stopped"
        );
        stats
    }

    fn stop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.jobs.close();

        {
            let mut state = self.shared.state.lock();
            while state.live > 0 {
                self.shared.state_changed.wait(&mut state);
            }
        }

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("Worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.stop();
        }
    }
}

fn worker_loop(id: usize, shared: Arc<PoolShared>) {
    debug!(worker = id, "Worker started");

    while let Some(Job { item, permit }) = shared.jobs.dequeue() {
        let handler = item.handler_name();
        shared.begin_execution();

        let result = panic::catch_unwind(AssertUnwindSafe(|| item.run(&shared.ctx)));
        match result {
            Ok(Ok(_)) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) if e.is_recoverable() => {
                warn!(worker = id, handler, "Transaction discarded: {}", e);
                shared.failed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                error!(worker = id, handler, "Transaction failed: {}", e);
                shared.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                error!(worker = id, handler, "Handler panicked");
                shared.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        shared.end_execution();
        drop(permit);
    }

    shared.worker_exited();
    debug!(worker = id, "Worker stopped");
}
