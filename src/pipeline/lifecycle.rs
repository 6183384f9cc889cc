//! Cooperative cancellation for the pipeline.
//!
//! A single shared token replaces per-thread alive flags: every blocking wait
//! in the queue and the reordering sink re-checks the token after waking, and
//! the coordinator broadcasts a wake-up on every condition after cancelling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation token passed to every pipeline component at
/// construction.
///
/// Cancellation is cooperative and flag-based: flipping the token never
/// interrupts a thread by force. The component that flips it must also wake
/// the condition variables its waiters block on (`WorkQueue::wake_all`,
/// `ReorderingSink::wake_all`) so the flag is observed promptly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the running (not cancelled) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    ///
    /// Returns true if this call performed the transition, false if the token
    /// was already cancelled.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
