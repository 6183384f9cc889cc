//! Segmenter: turns a continuous audio stream into discrete, speech-bearing,
//! sequence-numbered work items.

use crate::audio::source::AudioSource;
use crate::audio::vad::SpeechDetector;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::lifecycle::CancelToken;
use crate::pipeline::queue::WorkQueue;
use crate::pipeline::report::{ErrorReporter, LogReporter, PipelineError};
use crate::pipeline::types::WorkItem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why the capture loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnd {
    /// A finite source ran out of input. In-flight work keeps draining.
    Exhausted,
    /// The source failed repeatedly and is treated as permanently gone.
    /// The coordinator escalates this to full shutdown.
    SourceGone,
    /// Cancellation was observed mid-capture.
    Cancelled,
}

/// Accumulates samples into fixed-size windows, gates them through the
/// speech detector, and enqueues speech windows with the next sequence
/// number.
///
/// Silent windows are discarded without consuming a sequence number, so the
/// emitted sequence space stays gap-free. The window buffer is reset at every
/// threshold crossing either way; samples past the boundary carry over into
/// the next window.
pub struct Segmenter {
    source: Box<dyn AudioSource>,
    detector: Box<dyn SpeechDetector>,
    sample_rate: u32,
    window_samples: usize,
    reporter: Arc<dyn ErrorReporter>,
}

impl Segmenter {
    /// Creates a segmenter over the given source and speech detector.
    pub fn new(
        source: Box<dyn AudioSource>,
        detector: Box<dyn SpeechDetector>,
        sample_rate: u32,
        window_ms: u32,
    ) -> Self {
        let window_samples = (sample_rate as usize * window_ms as usize) / 1000;
        Self {
            source,
            detector,
            sample_rate,
            window_samples: window_samples.max(1),
            reporter: Arc::new(LogReporter),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Samples per window.
    pub fn window_samples(&self) -> usize {
        self.window_samples
    }

    /// Starts the underlying audio source.
    pub fn start(&mut self) -> Result<()> {
        self.source.start()
    }

    /// Capture loop. Runs until the source ends, fails permanently, or
    /// cancellation is observed.
    ///
    /// The sequence counter is shared for observability but has a single
    /// writer: this loop.
    pub fn run(
        mut self,
        queue: &WorkQueue<WorkItem>,
        sequence: &AtomicU64,
        token: &CancelToken,
    ) -> CaptureEnd {
        let mut window: Vec<i16> = Vec::with_capacity(self.window_samples);
        let mut consecutive_errors: u32 = 0;

        let end = loop {
            if token.is_cancelled() {
                break CaptureEnd::Cancelled;
            }

            let chunk = match self.source.read_chunk() {
                Ok(chunk) => {
                    consecutive_errors = 0;
                    chunk
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= defaults::MAX_CONSECUTIVE_READ_ERRORS {
                        self.reporter.report(
                            "segmenter",
                            &PipelineError::Fatal(format!(
                                "audio capture failed {consecutive_errors} times in a row: {e}"
                            )),
                        );
                        break CaptureEnd::SourceGone;
                    }
                    self.reporter
                        .report("segmenter", &PipelineError::Recoverable(e.to_string()));
                    continue;
                }
            };

            if chunk.is_empty() {
                if self.source.is_finite() {
                    // File/pipe source exhausted; a trailing partial window
                    // is dropped, matching live behavior.
                    break CaptureEnd::Exhausted;
                }
                // Live source: empty read is normal while the device
                // initializes. Keep reading.
                continue;
            }

            window.extend_from_slice(&chunk);

            while window.len() >= self.window_samples {
                let rest = window.split_off(self.window_samples);
                let full = std::mem::replace(&mut window, rest);

                if self.detector.is_speech(&full, self.sample_rate) {
                    let seq = sequence.fetch_add(1, Ordering::SeqCst);
                    if !queue.push(WorkItem::new(seq, full)) {
                        // Queue observed cancellation while we were blocked.
                        return self.finish(CaptureEnd::Cancelled);
                    }
                }
            }
        };

        self.finish(end)
    }

    fn finish(mut self, end: CaptureEnd) -> CaptureEnd {
        if let Err(e) = self.source.stop() {
            self.reporter.report(
                "segmenter",
                &PipelineError::Recoverable(format!("failed to stop audio source: {e}")),
            );
        }
        end
    }
}
