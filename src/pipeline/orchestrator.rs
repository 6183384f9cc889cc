//! Pipeline wiring and lifecycle coordination.
//!
//! Owns the running state of every component, propagates cancellation to all
//! blocked waiters, and guarantees a finite shutdown sequence:
//! flip the token, wake every condition, join against a deadline, then
//! discard anything still queued.

use crate::audio::source::AudioSource;
use crate::audio::vad::SpeechDetector;
use crate::defaults;
use crate::error::{Result, SeqscribeError};
use crate::output::OutputSink;
use crate::pipeline::lifecycle::CancelToken;
use crate::pipeline::queue::WorkQueue;
use crate::pipeline::reorder::{ReorderingSink, StallPolicy};
use crate::pipeline::report::{ErrorReporter, LogReporter, PipelineError};
use crate::pipeline::segmenter::{CaptureEnd, Segmenter};
use crate::pipeline::types::{Emission, WorkItem, WorkOutcome};
use crate::pipeline::worker::WorkerPool;
use crate::stt::transcriber::Transcriber;
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sample rate of the audio source in Hz.
    pub sample_rate: u32,
    /// Segment window duration in milliseconds.
    pub window_ms: u32,
    /// Number of parallel transcription workers.
    pub workers: usize,
    /// Work queue bound; `None` means unbounded.
    pub queue_capacity: Option<usize>,
    /// What to do when the next expected sequence never arrives.
    pub stall_policy: StallPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            window_ms: defaults::WINDOW_MS,
            workers: defaults::WORKERS,
            queue_capacity: Some(defaults::QUEUE_CAPACITY),
            stall_policy: StallPolicy::SkipAfter(Duration::from_millis(
                defaults::STALL_TIMEOUT_MS,
            )),
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    token: CancelToken,
    queue: Arc<WorkQueue<WorkItem>>,
    sink: Arc<ReorderingSink<WorkOutcome>>,
    sequence: Arc<AtomicU64>,
    threads: Vec<JoinHandle<()>>,
    result_rx: Option<crossbeam_channel::Receiver<Option<String>>>,
}

impl PipelineHandle {
    /// Returns true until cancellation has been requested.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Number of sequence numbers dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Number of sequences the emission loop has accounted for (emitted or
    /// skipped). Together with [`dispatched`](Self::dispatched) this exposes
    /// the sink's backlog for monitoring.
    pub fn completed(&self) -> u64 {
        self.sink.next_expected()
    }

    /// Requests cancellation and wakes every blocked waiter. Idempotent and
    /// safe to call while components are mid-operation.
    pub fn cancel(&self) {
        self.token.cancel();
        // Waking on every call is harmless and keeps repeat cancellation
        // race-free even if a waiter blocked between calls.
        self.queue.wake_all();
        self.sink.wake_all();
    }

    /// Stops the pipeline and returns the output sink's accumulated result.
    ///
    /// Waits up to 5s for the result, then 1s for threads to finish. After
    /// the deadline, remaining threads are detached — they die with the
    /// process. Queued-but-unprocessed segments are discarded.
    pub fn stop(mut self) -> Option<String> {
        self.cancel();

        // The emission thread sends the sink's finish() result once it
        // observes cancellation; allow in-flight transcription to complete.
        let result = self
            .result_rx
            .as_ref()
            .and_then(|rx| rx.recv_timeout(Duration::from_secs(5)).ok().flatten());

        let deadline = Instant::now() + Duration::from_secs(1);
        let poll_interval = Duration::from_millis(50);

        loop {
            // Drain finished threads, joining each to catch panics
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let msg = panic_info
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                            .unwrap_or("unknown panic");
                        eprintln!("seqscribe: pipeline thread panicked: {msg}");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }

            if Instant::now() >= deadline {
                eprintln!(
                    "seqscribe: shutdown timeout — {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }

            thread::sleep(poll_interval);
        }

        // Release work that was queued but never processed.
        let dropped = self.queue.drain();
        if !dropped.is_empty() {
            eprintln!(
                "seqscribe: discarded {} unprocessed segment(s)",
                dropped.len()
            );
        }

        result
    }
}

/// Ordered transcription pipeline:
/// AudioSource → Segmenter → WorkQueue → WorkerPool(×N) → ReorderingSink → OutputSink.
pub struct Pipeline {
    config: PipelineConfig,
    reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a new pipeline with the default stderr error reporter.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Starts the pipeline.
    ///
    /// # Arguments
    /// * `source` - audio capture source
    /// * `detector` - voice-activity predicate gating windows
    /// * `transcriber` - speech-to-text engine, invoked concurrently
    /// * `sink` - ordered output handler
    ///
    /// # Returns
    /// Handle to monitor and stop the pipeline. Fails fast if the source
    /// cannot start or the configuration is unusable.
    pub fn start(
        self,
        source: Box<dyn AudioSource>,
        detector: Box<dyn SpeechDetector>,
        transcriber: Arc<dyn Transcriber>,
        sink: Box<dyn OutputSink>,
    ) -> Result<PipelineHandle> {
        if self.config.workers == 0 {
            return Err(SeqscribeError::ConfigInvalidValue {
                key: "workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let token = CancelToken::new();
        let sequence = Arc::new(AtomicU64::new(0));
        let queue = Arc::new(WorkQueue::with_capacity(
            self.config.queue_capacity,
            token.clone(),
        ));
        let reorder = Arc::new(ReorderingSink::new(
            self.config.stall_policy,
            token.clone(),
        ));

        let mut segmenter = Segmenter::new(
            source,
            detector,
            self.config.sample_rate,
            self.config.window_ms,
        )
        .with_reporter(self.reporter.clone());

        // Surface device failures to the caller before spawning anything.
        segmenter.start()?;

        let pool = WorkerPool::spawn(
            self.config.workers,
            queue.clone(),
            reorder.clone(),
            transcriber,
            self.reporter.clone(),
        );

        // Capture thread: only a permanently-gone source escalates to full
        // shutdown; a finite source running out lets in-flight work drain.
        let capture_handle = {
            let queue = queue.clone();
            let reorder = reorder.clone();
            let token = token.clone();
            let sequence = sequence.clone();
            thread::spawn(move || {
                let end = segmenter.run(&queue, &sequence, &token);
                if end == CaptureEnd::SourceGone && token.cancel() {
                    queue.wake_all();
                    reorder.wake_all();
                }
            })
        };

        // Emission thread: the single consumer of the reordering sink.
        let (result_tx, result_rx) = bounded(1);
        let emit_handle = {
            let reorder = reorder.clone();
            let reporter = self.reporter.clone();
            let mut sink = sink;
            thread::spawn(move || {
                while let Some(emission) = reorder.next_blocking() {
                    let handled = match emission {
                        Emission::Item {
                            value: WorkOutcome::Text(text),
                            ..
                        } => sink.handle(&text),
                        Emission::Item {
                            sequence,
                            value: WorkOutcome::Failed(message),
                        } => sink.handle_failed(sequence, &message),
                        Emission::Skipped { sequence } => sink.handle_skipped(sequence),
                    };
                    if let Err(e) = handled {
                        reporter.report(sink.name(), &PipelineError::Recoverable(e.to_string()));
                    }
                }

                if result_tx.send(sink.finish()).is_err() {
                    eprintln!("seqscribe: sink shutdown — result receiver already dropped");
                }
            })
        };

        let mut threads = vec![capture_handle, emit_handle];
        threads.extend(pool.into_handles());

        Ok(PipelineHandle {
            token,
            queue,
            sink: reorder,
            sequence,
            threads,
            result_rx: Some(result_rx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockAudioSource;
    use crate::audio::vad::RmsDetector;
    use crate::output::CollectorSink;
    use crate::stt::transcriber::MockTranscriber;

    fn loud_chunk(windows: usize) -> Vec<i16> {
        // Alternating ±8000 is well above the default RMS threshold.
        (0..16000 * windows)
            .map(|i| if i % 2 == 0 { 8000 } else { -8000 })
            .collect()
    }

    fn wait_for_completed(handle: &PipelineHandle, expected: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.completed() < expected {
            assert!(Instant::now() < deadline, "pipeline stalled");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.window_ms, 1000);
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, Some(64));
        assert_eq!(
            config.stall_policy,
            StallPolicy::SkipAfter(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = PipelineConfig {
            workers: 0,
            ..Default::default()
        };
        let result = Pipeline::new(config).start(
            Box::new(MockAudioSource::new()),
            Box::new(RmsDetector::default()),
            Arc::new(MockTranscriber::new("m")),
            Box::new(CollectorSink::new()),
        );
        assert!(matches!(
            result,
            Err(SeqscribeError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_failing_source_start_propagates() {
        let result = Pipeline::new(PipelineConfig::default()).start(
            Box::new(MockAudioSource::new().with_start_failure()),
            Box::new(RmsDetector::default()),
            Arc::new(MockTranscriber::new("m")),
            Box::new(CollectorSink::new()),
        );
        assert!(matches!(result, Err(SeqscribeError::AudioCapture { .. })));
    }

    #[test]
    fn test_end_to_end_collects_in_order() {
        let handle = Pipeline::new(PipelineConfig::default())
            .start(
                Box::new(MockAudioSource::new().with_chunks(vec![loud_chunk(3)])),
                Box::new(RmsDetector::default()),
                Arc::new(MockTranscriber::new("m").with_response("word")),
                Box::new(CollectorSink::new()),
            )
            .unwrap();

        wait_for_completed(&handle, 3);
        assert_eq!(handle.dispatched(), 3);

        let result = handle.stop();
        assert_eq!(result, Some("word word word".to_string()));
    }

    #[test]
    fn test_silence_produces_no_work() {
        let handle = Pipeline::new(PipelineConfig::default())
            .start(
                Box::new(MockAudioSource::new().with_chunks(vec![vec![0i16; 16000 * 2]])),
                Box::new(RmsDetector::default()),
                Arc::new(MockTranscriber::new("m")),
                Box::new(CollectorSink::new()),
            )
            .unwrap();

        // Give the capture thread time to chew through both windows.
        thread::sleep(Duration::from_millis(100));
        assert_eq!(handle.dispatched(), 0);

        let result = handle.stop();
        assert_eq!(result, None);
    }

    #[test]
    fn test_stop_with_nothing_pending_terminates() {
        let handle = Pipeline::new(PipelineConfig::default())
            .start(
                Box::new(MockAudioSource::new()),
                Box::new(RmsDetector::default()),
                Arc::new(MockTranscriber::new("m")),
                Box::new(CollectorSink::new()),
            )
            .unwrap();

        assert!(handle.is_running());
        let result = handle.stop();
        assert_eq!(result, None);
    }

    #[test]
    fn test_cancel_is_idempotent_through_handle() {
        let handle = Pipeline::new(PipelineConfig::default())
            .start(
                Box::new(MockAudioSource::new()),
                Box::new(RmsDetector::default()),
                Arc::new(MockTranscriber::new("m")),
                Box::new(CollectorSink::new()),
            )
            .unwrap();

        handle.cancel();
        handle.cancel();
        assert!(!handle.is_running());

        // stop() after manual cancellation must still terminate cleanly.
        let _ = handle.stop();
    }

    #[test]
    fn test_source_gone_shuts_pipeline_down() {
        let handle = Pipeline::new(PipelineConfig::default())
            .start(
                Box::new(MockAudioSource::new().with_read_failure()),
                Box::new(RmsDetector::default()),
                Arc::new(MockTranscriber::new("m")),
                Box::new(CollectorSink::new()),
            )
            .unwrap();

        // The capture loop escalates after repeated failures.
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.is_running() {
            assert!(Instant::now() < deadline, "escalation never happened");
            thread::sleep(Duration::from_millis(10));
        }

        let _ = handle.stop();
    }
}
