//! Reordering sink: restores capture order over unordered worker completions.
//!
//! Workers submit `(sequence, value)` pairs in whatever order they finish;
//! a single emission loop blocks until the next expected sequence is present
//! and releases values strictly in ascending order, one at a time.

use crate::pipeline::lifecycle::CancelToken;
use crate::pipeline::types::Emission;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Policy for a sequence that never arrives (e.g., its worker is stuck).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallPolicy {
    /// Wait forever. Pending results accumulate behind the gap, bounded only
    /// by total sequence count — an accepted liveness risk.
    Unbounded,
    /// Once a later result has waited this long, treat the missing sequence
    /// as failed: emit one `Emission::Skipped` for it and advance.
    SkipAfter(Duration),
}

/// What the sink did with a submitted result.
///
/// Callers must distinguish `Rejected` from `Cancelled`: a rejected submit is
/// local to one sequence (already emitted, skipped past, or duplicated) and
/// the submitter keeps working, while a cancelled submit means the whole
/// pipeline is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Buffered for in-order emission.
    Accepted,
    /// The sequence was already emitted, skipped past, or is already
    /// buffered. The value is dropped; the submitter continues.
    Rejected,
    /// Cancellation was observed; no further results are deliverable.
    Cancelled,
}

/// A completed-but-not-yet-emittable result, ordered by sequence.
struct Pending<T> {
    sequence: u64,
    value: T,
    arrived: Instant,
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl<T> Eq for Pending<T> {}

impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Pending<T> {
    // Reversed so BinaryHeap pops the smallest sequence first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.sequence.cmp(&self.sequence)
    }
}

struct State<T> {
    pending: BinaryHeap<Pending<T>>,
    next_expected: u64,
}

/// Thread-safe fan-in point that buffers out-of-order results and releases
/// them in strict sequence order with no gaps and no duplicates.
///
/// Invariant: every buffered entry satisfies `sequence >= next_expected`
/// (the entry equal to `next_expected` is released by the next
/// `next_blocking` call); duplicates are rejected on entry; nothing is
/// retained forever — entries are emitted, skipped past, or discarded at
/// shutdown.
pub struct ReorderingSink<T> {
    state: Mutex<State<T>>,
    available: Condvar,
    policy: StallPolicy,
    token: CancelToken,
}

impl<T> ReorderingSink<T> {
    /// Creates a sink expecting sequence 0 first.
    pub fn new(policy: StallPolicy, token: CancelToken) -> Self {
        Self {
            state: Mutex::new(State {
                pending: BinaryHeap::new(),
                next_expected: 0,
            }),
            available: Condvar::new(),
            policy,
            token,
        }
    }

    /// Submits a completed result, waking the emission loop.
    ///
    /// A sequence that was already emitted, skipped past (under
    /// [`StallPolicy::SkipAfter`]), or is already buffered is rejected — a
    /// duplicate is never buffered twice, and a late result for a skipped
    /// sequence is dropped.
    pub fn submit(&self, sequence: u64, value: T) -> SubmitOutcome {
        let mut state = self.lock();

        if self.token.is_cancelled() {
            return SubmitOutcome::Cancelled;
        }
        if sequence < state.next_expected {
            return SubmitOutcome::Rejected;
        }
        if state.pending.iter().any(|p| p.sequence == sequence) {
            return SubmitOutcome::Rejected;
        }

        state.pending.push(Pending {
            sequence,
            value,
            arrived: Instant::now(),
        });
        self.available.notify_all();
        SubmitOutcome::Accepted
    }

    /// Blocks until the next expected sequence can be accounted for, then
    /// returns it: either its value, or a skip notification under
    /// [`StallPolicy::SkipAfter`].
    ///
    /// Returns `None` once cancellation is observed; anything still buffered
    /// is discarded with the sink.
    pub fn next_blocking(&self) -> Option<Emission<T>> {
        let mut state = self.lock();

        loop {
            if self.token.is_cancelled() {
                return None;
            }

            let head_info = state
                .pending
                .peek()
                .map(|head| (head.sequence, head.arrived));

            match head_info {
                Some((sequence, _)) if sequence == state.next_expected => {
                    let head = state.pending.pop().map(|p| p.value);
                    state.next_expected = sequence + 1;
                    // peek() just matched, so pop() cannot be empty
                    let value = head?;
                    return Some(Emission::Item { sequence, value });
                }
                Some((_, arrived)) => {
                    // Gap: the head completed out of order and must wait for
                    // the missing sequence, or time out past it.
                    match self.policy {
                        StallPolicy::Unbounded => {
                            state = self.wait(state);
                        }
                        StallPolicy::SkipAfter(timeout) => {
                            let deadline = arrived + timeout;
                            let now = Instant::now();
                            if now >= deadline {
                                let sequence = state.next_expected;
                                state.next_expected += 1;
                                return Some(Emission::Skipped { sequence });
                            }
                            state = self.wait_timeout(state, deadline - now);
                        }
                    }
                }
                None => {
                    state = self.wait(state);
                }
            }
        }
    }

    /// Wakes the emission loop so it observes the cancellation token.
    pub fn wake_all(&self) {
        let _state = self.lock();
        self.available.notify_all();
    }

    /// Number of buffered out-of-order results.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// The sequence the emission loop will release next.
    pub fn next_expected(&self) -> u64 {
        self.lock().next_expected
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        match self.available.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, State<T>>,
        timeout: Duration,
    ) -> MutexGuard<'a, State<T>> {
        match self.available.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}
