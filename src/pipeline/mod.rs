//! Sequenced fan-out/fan-in transcription pipeline.
//!
//! A single segmenter emits ordered work items; N parallel workers consume
//! and process them with unordered completion; a reordering sink releases
//! results strictly in capture order. Each thread-safe handoff point (the
//! work queue and the reordering sink) pairs a mutex with condition
//! variables for blocking waits; cancellation is a shared token re-checked
//! at every wait.

pub mod lifecycle;
pub mod orchestrator;
pub mod queue;
pub mod reorder;
pub mod report;
pub mod segmenter;
pub mod types;
pub mod worker;

pub use lifecycle::CancelToken;
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use queue::WorkQueue;
pub use reorder::{ReorderingSink, StallPolicy, SubmitOutcome};
pub use report::{ErrorReporter, LogReporter, PipelineError};
pub use segmenter::{CaptureEnd, Segmenter};
pub use types::{Emission, ResultItem, WorkItem, WorkOutcome};
pub use worker::WorkerPool;
