//! Pluggable output handlers for ordered transcription results.
//!
//! Pairs with `AudioSource` on the input side: the emission loop feeds every
//! sink exactly one event per sequence number, in sequence order.

use crate::error::Result;

/// Pluggable text output handler for the pipeline.
///
/// Called from the single emission thread, strictly in sequence order.
pub trait OutputSink: Send + 'static {
    /// Handle transcribed text. Called once per successful sequence.
    fn handle(&mut self, text: &str) -> Result<()>;

    /// Handle a sequence whose transcription failed. The pipeline emits this
    /// marker in place of text so order is preserved. Default: ignore.
    fn handle_failed(&mut self, _sequence: u64, _message: &str) -> Result<()> {
        Ok(())
    }

    /// Handle a sequence skipped by the stall-timeout policy. Default: ignore.
    fn handle_skipped(&mut self, _sequence: u64) -> Result<()> {
        Ok(())
    }

    /// Called on pipeline shutdown. Return accumulated text if applicable.
    fn finish(&mut self) -> Option<String> {
        None
    }

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Collects transcribed text for bounded runs and library use.
/// Returns accumulated text on finish().
pub struct CollectorSink {
    collected: Vec<String>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self {
            collected: Vec::new(),
        }
    }
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for CollectorSink {
    fn handle(&mut self, text: &str) -> Result<()> {
        self.collected.push(text.to_string());
        Ok(())
    }

    fn finish(&mut self) -> Option<String> {
        if self.collected.is_empty() {
            None
        } else {
            Some(self.collected.join(" "))
        }
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Pipe mode sink — writes transcribed text to stdout, one line per segment.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn handle(&mut self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn handle_failed(&mut self, sequence: u64, message: &str) -> Result<()> {
        eprintln!("seqscribe: segment {sequence} failed: {message}");
        Ok(())
    }

    fn handle_skipped(&mut self, sequence: u64) -> Result<()> {
        eprintln!("seqscribe: segment {sequence} timed out, skipped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
