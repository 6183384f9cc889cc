//! FIFO work queue between the segmenter and the worker pool.
//!
//! A mutex/condvar holding area that decouples segment production rate from
//! worker consumption rate. Dispatch order is strictly FIFO; restoring
//! capture order is the reordering sink's job, never the queue's.

use crate::pipeline::lifecycle::CancelToken;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

/// Thread-safe FIFO queue with blocking pop and optional bounded capacity.
///
/// With a capacity set, `push` blocks while the queue is full (backpressure
/// on the capture side). Every blocking wait re-checks the cancellation token
/// after waking and exits instead of continuing to wait.
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
    token: CancelToken,
}

impl<T> WorkQueue<T> {
    /// Creates an unbounded queue.
    pub fn new(token: CancelToken) -> Self {
        Self::with_capacity(None, token)
    }

    /// Creates a queue, bounded if `capacity` is `Some`.
    pub fn with_capacity(capacity: Option<usize>, token: CancelToken) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            token,
        }
    }

    /// Appends an item, waking blocked consumers.
    ///
    /// Blocks while the queue is at capacity. Returns false (dropping the
    /// item) once cancellation is observed; the pipeline is shutting down and
    /// no further work may be dispatched.
    pub fn push(&self, item: T) -> bool {
        let mut items = self.lock();

        if let Some(capacity) = self.capacity {
            while items.len() >= capacity && !self.token.is_cancelled() {
                items = self.wait(&self.not_full, items);
            }
        }

        if self.token.is_cancelled() {
            return false;
        }

        items.push_back(item);
        self.not_empty.notify_all();
        true
    }

    /// Removes and returns the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once cancellation is observed — including when items
    /// remain queued: after shutdown, leftovers are drained and discarded by
    /// the coordinator, never processed.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut items = self.lock();

        loop {
            if self.token.is_cancelled() {
                return None;
            }
            if let Some(item) = items.pop_front() {
                self.not_full.notify_all();
                return Some(item);
            }
            items = self.wait(&self.not_empty, items);
        }
    }

    /// Wakes every blocked producer and consumer so they observe the
    /// cancellation token. Called by the coordinator after cancelling.
    pub fn wake_all(&self) {
        // Take the lock so wake-ups cannot race a waiter between its token
        // check and its wait.
        let _items = self.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Removes and returns all queued items. Used at shutdown to discard
    /// work that will never be processed.
    pub fn drain(&self) -> Vec<T> {
        let mut items = self.lock();
        let drained = items.drain(..).collect();
        self.not_full.notify_all();
        drained
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait<'a>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, VecDeque<T>>,
    ) -> MutexGuard<'a, VecDeque<T>> {
        match condvar.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
