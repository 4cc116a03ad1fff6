//! Thread-safe unbounded FIFO queue with blocking dequeue
//!
//! `BlockingQueue` serves both as the inbound transaction channel and as the
//! worker pool's internal work channel.
//!
//! # Semantics
//!
//! - `enqueue` appends to the tail and never blocks or fails.
//! - `dequeue` blocks until an item is available and removes the head.
//! - Once the queue is closed, `dequeue` keeps returning the remaining items
//!   and then `None` ("no more work") instead of blocking forever. Closing
//!   wakes every blocked consumer.
//!
//! Items enqueued by a single producer are dequeued in the same order.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded multi-producer multi-consumer blocking queue
#[derive(Debug)]
pub struct BlockingQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an item to the tail and wake one waiting consumer
    ///
    /// Items enqueued after `close` are still delivered before the
    /// "no more work" result.
    pub fn enqueue(&self, item: T) {
        let mut state = self.state.lock();
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
    }

    /// Remove the head item, blocking until one is available
    ///
    /// Returns `None` once the queue is closed and empty.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Mark the queue as finished and wake every blocked consumer
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
