//! Error reporting for pipeline components.

use thiserror::Error;

/// Errors raised while a component processes one unit of work.
///
/// Distinct from [`SeqscribeError`](crate::error::SeqscribeError): these are
/// absorbed per item and classified by severity, not returned to a caller.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Recoverable error; the component continues with its next item.
    #[error("Recoverable error: {0}")]
    Recoverable(String),
    /// Fatal error; the component escalates to full shutdown.
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Trait for reporting per-item component errors.
///
/// Component-local failures (one window, one work item) are absorbed and
/// reported here rather than propagated; only fatal collaborator failures
/// trigger shutdown.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from a named component.
    fn report(&self, component: &str, error: &PipelineError);
}

/// Simple error reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, component: &str, error: &PipelineError) {
        eprintln!("[{}] {}", component, error);
    }
}
