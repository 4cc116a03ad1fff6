//! Counting admission permits for backpressure
//!
//! The dispatcher takes one permit per work item before submitting it and the
//! worker that executes the item gives it back, so no more than `limit` items
//! are ever in flight. Permits are RAII values that can cross threads.
//!
//! Blocking waits are counted so a stalled pipeline shows up in the pool
//! statistics instead of hanging silently.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Bounded counting semaphore
#[derive(Debug)]
pub struct Admission {
    available: Mutex<usize>,
    released: Condvar,
    waits: AtomicU64,
}

impl Admission {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            available: Mutex::new(limit),
            released: Condvar::new(),
            waits: AtomicU64::new(0),
        })
    }

    /// Take a permit, blocking while none are free
    pub fn acquire(self: &Arc<Self>) -> AdmissionPermit {
        let mut available = self.available.lock();
        if *available == 0 {
            let waits = self.waits.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(waits, "admission exhausted, waiting for a permit");
            while *available == 0 {
                self.released.wait(&mut available);
            }
        }
        *available -= 1;

        AdmissionPermit {
            admission: Arc::clone(self),
        }
    }

    /// Number of `acquire` calls that had to block
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }

    fn release(&self) {
        *self.available.lock() += 1;
        self.released.notify_one();
    }
}

/// One unit of in-flight capacity, returned on drop
#[derive(Debug)]
pub struct AdmissionPermit {
    admission: Arc<Admission>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.admission.release();
    }
}
