//! seqscribe - ordered live transcription.
//!
//! Captures audio continuously, fans speech segments out to parallel
//! transcription workers, and fans results back in so output leaves in
//! strict capture order. Engines, devices, and output destinations are
//! collaborators behind traits.

// Enforce error handling discipline in library code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod stt;

// Core traits (source → process → sink)
pub use audio::source::AudioSource;
pub use audio::vad::SpeechDetector;
pub use output::{CollectorSink, OutputSink, StdoutSink};
pub use stt::transcriber::Transcriber;

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use pipeline::reorder::StallPolicy;

// Error handling
pub use error::{Result, SeqscribeError};

// Config
pub use config::Config;

// Component building blocks (for advanced users)
pub use pipeline::lifecycle::CancelToken;
pub use pipeline::queue::WorkQueue;
pub use pipeline::reorder::{ReorderingSink, SubmitOutcome};
pub use pipeline::report::{ErrorReporter, LogReporter, PipelineError};
