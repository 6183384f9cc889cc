//! Worker pool: N parallel transcription workers between the work queue and
//! the reordering sink.

use crate::pipeline::queue::WorkQueue;
use crate::pipeline::reorder::{ReorderingSink, SubmitOutcome};
use crate::pipeline::report::{ErrorReporter, PipelineError};
use crate::pipeline::types::{ResultItem, WorkItem, WorkOutcome};
use crate::stt::transcriber::Transcriber;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A fixed pool of identical workers.
///
/// Each worker loops: blocking-pop a work item, invoke the transcriber,
/// submit the outcome under the item's sequence number, repeat. Workers have
/// no ordering relationship to each other; order is restored downstream.
///
/// A failed item still submits a [`WorkOutcome::Failed`] marker — the
/// reordering sink must never wait on a sequence that cannot arrive.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` threads over the shared queue and sink.
    pub fn spawn(
        workers: usize,
        queue: Arc<WorkQueue<WorkItem>>,
        sink: Arc<ReorderingSink<WorkOutcome>>,
        transcriber: Arc<dyn Transcriber>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let handles = (0..workers)
            .map(|_| {
                let queue = queue.clone();
                let sink = sink.clone();
                let transcriber = transcriber.clone();
                let reporter = reporter.clone();
                thread::spawn(move || {
                    Self::run_worker(&queue, &sink, transcriber.as_ref(), reporter.as_ref());
                })
            })
            .collect();

        Self { handles }
    }

    /// One worker's loop. No lock is held across the transcriber call.
    fn run_worker(
        queue: &WorkQueue<WorkItem>,
        sink: &ReorderingSink<WorkOutcome>,
        transcriber: &dyn Transcriber,
        reporter: &dyn ErrorReporter,
    ) {
        while let Some(item) = queue.pop_blocking() {
            let outcome = match transcriber.process(&item.samples) {
                Ok(text) => WorkOutcome::Text(text),
                Err(e) => {
                    reporter.report(
                        "worker",
                        &PipelineError::Recoverable(format!(
                            "segment {} failed: {e}",
                            item.sequence
                        )),
                    );
                    WorkOutcome::Failed(e.to_string())
                }
            };

            // The result always carries the sequence of the item it came from.
            let result = ResultItem::new(item.sequence, outcome);
            match sink.submit(result.sequence, result.outcome) {
                SubmitOutcome::Accepted => {}
                SubmitOutcome::Rejected => {
                    // The sink skipped past this sequence while we were
                    // processing it. The result is lost; the worker is not.
                    reporter.report(
                        "worker",
                        &PipelineError::Recoverable(format!(
                            "discarding late result for sequence {}",
                            result.sequence
                        )),
                    );
                }
                SubmitOutcome::Cancelled => {
                    // Pipeline shutdown; nothing left to deliver to.
                    break;
                }
            }
        }
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit, reporting panics to stderr.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                eprintln!("seqscribe: worker thread panicked");
            }
        }
    }

    /// Releases the worker handles without joining, detaching the threads.
    pub(crate) fn into_handles(self) -> Vec<JoinHandle<()>> {
        self.handles
    }
}
