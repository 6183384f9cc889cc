//! End-to-end ordering, failure, and shutdown scenarios for the pipeline.
//!
//! Work items carry scripted metadata in their first samples: sample 0 is the
//! transcription delay in milliseconds, sample 1 is the segment index the
//! mock engine echoes back. The remaining samples are loud enough to pass
//! the RMS speech gate, so each built window becomes exactly one work item.

use seqscribe::audio::source::MockAudioSource;
use seqscribe::audio::vad::RmsDetector;
use seqscribe::error::{Result, SeqscribeError};
use seqscribe::output::{CollectorSink, OutputSink};
use seqscribe::pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
use seqscribe::pipeline::reorder::StallPolicy;
use seqscribe::stt::transcriber::Transcriber;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const SAMPLE_RATE: u32 = 16000;
const WINDOW_MS: u32 = 10;
const WINDOW_SAMPLES: usize = (SAMPLE_RATE as usize * WINDOW_MS as usize) / 1000;

/// Builds one speech window carrying `(delay_ms, index)` metadata.
fn window(delay_ms: i16, index: i16) -> Vec<i16> {
    let mut samples: Vec<i16> = (0..WINDOW_SAMPLES)
        .map(|i| if i % 2 == 0 { 8000 } else { -8000 })
        .collect();
    samples[0] = delay_ms;
    samples[1] = index;
    samples
}

/// Concatenates windows into a single audio chunk.
fn audio(windows: &[(i16, i16)]) -> Vec<i16> {
    windows
        .iter()
        .flat_map(|&(delay, index)| window(delay, index))
        .collect()
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        sample_rate: SAMPLE_RATE,
        window_ms: WINDOW_MS,
        workers: 4,
        queue_capacity: Some(16),
        stall_policy: StallPolicy::SkipAfter(Duration::from_secs(5)),
    }
}

/// Mock engine: sleeps for the scripted delay, echoes the scripted index.
/// Counts invocations so tests can prove nothing ran after cancellation.
struct ScriptedEngine {
    invocations: Arc<AtomicU64>,
    fail_indices: Vec<i16>,
}

impl ScriptedEngine {
    fn new() -> Self {
        Self {
            invocations: Arc::new(AtomicU64::new(0)),
            fail_indices: Vec::new(),
        }
    }

    fn failing_on(mut self, indices: Vec<i16>) -> Self {
        self.fail_indices = indices;
        self
    }

    fn invocations(&self) -> Arc<AtomicU64> {
        self.invocations.clone()
    }
}

impl Transcriber for ScriptedEngine {
    fn process(&self, audio: &[i16]) -> Result<String> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let delay_ms = audio.first().copied().unwrap_or(0) as u64;
        let index = audio.get(1).copied().unwrap_or(-1);
        thread::sleep(Duration::from_millis(delay_ms));
        if self.fail_indices.contains(&index) {
            Err(SeqscribeError::Transcription {
                message: format!("scripted failure for segment {index}"),
            })
        } else {
            Ok(index.to_string())
        }
    }

    fn model_name(&self) -> &str {
        "scripted-engine"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Sink recording every event in arrival order, shared with the test thread.
#[derive(Clone)]
struct RecordingSink {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn handle(&mut self, text: &str) -> Result<()> {
        self.events.lock().unwrap().push(format!("text:{text}"));
        Ok(())
    }

    fn handle_failed(&mut self, sequence: u64, _message: &str) -> Result<()> {
        self.events.lock().unwrap().push(format!("failed:{sequence}"));
        Ok(())
    }

    fn handle_skipped(&mut self, sequence: u64) -> Result<()> {
        self.events.lock().unwrap().push(format!("skipped:{sequence}"));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn wait_for_completed(handle: &PipelineHandle, expected: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while handle.completed() < expected {
        assert!(
            Instant::now() < deadline,
            "pipeline stalled at {}/{expected}",
            handle.completed()
        );
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn emission_order_matches_capture_order_despite_completion_order() {
    // Segment 2 finishes first, then 0, then 1.
    let chunks = vec![audio(&[(60, 0), (120, 1), (5, 2)])];
    let engine = ScriptedEngine::new();

    let handle = Pipeline::new(test_config())
        .start(
            Box::new(MockAudioSource::new().with_chunks(chunks)),
            Box::new(RmsDetector::default()),
            Arc::new(engine),
            Box::new(CollectorSink::new()),
        )
        .unwrap();

    wait_for_completed(&handle, 3);
    let result = handle.stop();

    assert_eq!(result, Some("0 1 2".to_string()));
}

#[test]
fn every_sequence_emitted_exactly_once_under_random_jitter() {
    // 24 segments with pseudo-random delays; 4 workers race through them.
    let mut seed: u64 = 0x5eed;
    let script: Vec<(i16, i16)> = (0..24)
        .map(|i| {
            // Small LCG keeps the test deterministic without extra deps.
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let delay = (seed >> 33) % 40;
            (delay as i16, i)
        })
        .collect();
    let chunks = vec![audio(&script)];

    let handle = Pipeline::new(test_config())
        .start(
            Box::new(MockAudioSource::new().with_chunks(chunks)),
            Box::new(RmsDetector::default()),
            Arc::new(ScriptedEngine::new()),
            Box::new(CollectorSink::new()),
        )
        .unwrap();

    wait_for_completed(&handle, 24);
    let result = handle.stop().unwrap();

    let expected: Vec<String> = (0..24).map(|i| i.to_string()).collect();
    assert_eq!(result, expected.join(" "));
}

#[test]
fn failed_segment_emits_error_marker_and_never_stalls_later_segments() {
    // Segment 1 fails; 0 and 2 succeed. The sink must still see 0, 1, 2.
    let chunks = vec![audio(&[(10, 0), (10, 1), (10, 2)])];
    let engine = ScriptedEngine::new().failing_on(vec![1]);
    let sink = RecordingSink::new();
    let events = sink.clone();

    let handle = Pipeline::new(test_config())
        .start(
            Box::new(MockAudioSource::new().with_chunks(chunks)),
            Box::new(RmsDetector::default()),
            Arc::new(engine),
            Box::new(sink),
        )
        .unwrap();

    wait_for_completed(&handle, 3);
    handle.stop();

    assert_eq!(
        events.events(),
        vec![
            "text:0".to_string(),
            "failed:1".to_string(),
            "text:2".to_string(),
        ]
    );
}

#[test]
fn cancellation_stops_all_threads_and_processes_nothing_further() {
    // 8 slow segments with 2 workers: most are still queued when we cancel.
    let script: Vec<(i16, i16)> = (0..8).map(|i| (150, i)).collect();
    let chunks = vec![audio(&script)];
    let engine = ScriptedEngine::new();
    let invocations = engine.invocations();

    let config = PipelineConfig {
        workers: 2,
        ..test_config()
    };
    let handle = Pipeline::new(config)
        .start(
            Box::new(MockAudioSource::new().with_chunks(chunks)),
            Box::new(RmsDetector::default()),
            Arc::new(engine),
            Box::new(CollectorSink::new()),
        )
        .unwrap();

    // Let the first items reach the workers, then cancel mid-flight.
    thread::sleep(Duration::from_millis(100));
    let stop_started = Instant::now();
    handle.stop();
    assert!(
        stop_started.elapsed() < Duration::from_secs(7),
        "shutdown exceeded its grace period"
    );

    // No work item may start processing after cancellation was observed.
    let after_stop = invocations.load(Ordering::SeqCst);
    assert!(after_stop < 8, "cancellation should strand queued items");
    thread::sleep(Duration::from_millis(300));
    assert_eq!(
        invocations.load(Ordering::SeqCst),
        after_stop,
        "a worker processed an item after shutdown completed"
    );
}

#[test]
fn repeated_cancellation_is_idempotent() {
    let handle = Pipeline::new(test_config())
        .start(
            Box::new(MockAudioSource::new()),
            Box::new(RmsDetector::default()),
            Arc::new(ScriptedEngine::new()),
            Box::new(CollectorSink::new()),
        )
        .unwrap();

    handle.cancel();
    handle.cancel();
    assert!(!handle.is_running());

    let stop_started = Instant::now();
    assert_eq!(handle.stop(), None);
    assert!(stop_started.elapsed() < Duration::from_secs(7));
}

#[test]
fn stalled_sequence_is_skipped_with_notification_under_timeout_policy() {
    // Segment 0 wedges its worker far longer than the stall timeout while
    // segments 1 and 2 complete quickly.
    let chunks = vec![audio(&[(2000, 0), (5, 1), (5, 2)])];
    let sink = RecordingSink::new();
    let events = sink.clone();

    let config = PipelineConfig {
        workers: 3,
        stall_policy: StallPolicy::SkipAfter(Duration::from_millis(200)),
        ..test_config()
    };
    let handle = Pipeline::new(config)
        .start(
            Box::new(MockAudioSource::new().with_chunks(chunks)),
            Box::new(RmsDetector::default()),
            Arc::new(ScriptedEngine::new()),
            Box::new(sink),
        )
        .unwrap();

    wait_for_completed(&handle, 3);
    handle.stop();

    let recorded = events.events();
    assert_eq!(recorded[0], "skipped:0");
    assert_eq!(recorded[1], "text:1");
    assert_eq!(recorded[2], "text:2");
}
