//! Default configuration constants for seqscribe.
//!
//! Shared constants used across configuration types to ensure consistency
//! and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default segment window duration in milliseconds.
///
/// Each window is classified as speech or silence as a unit, so it should be
/// long enough to carry a phrase but short enough to keep latency low.
pub const WINDOW_MS: u32 = 1000;

/// Default Voice Activity Detection (VAD) threshold.
///
/// This RMS-based threshold (0.0 to 1.0) determines when a window is
/// considered speech. A value of 0.02 is tuned for typical microphone input
/// levels and provides good sensitivity while filtering out background noise.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Default number of parallel transcription workers.
///
/// Transcription dominates pipeline latency; a small pool keeps several
/// windows in flight without oversubscribing the engine.
pub const WORKERS: usize = 4;

/// Default work queue capacity (segments buffered between capture and workers).
///
/// A bounded queue applies backpressure to the capture side under sustained
/// overload. Zero in the config means unbounded.
pub const QUEUE_CAPACITY: usize = 64;

/// Default stall timeout in milliseconds for the reordering sink.
///
/// If the next expected sequence has not arrived after later results have
/// waited this long, it is skipped with a notification instead of stalling
/// emission forever. Zero in the config disables the timeout.
pub const STALL_TIMEOUT_MS: u64 = 30_000;

/// Consecutive audio read failures tolerated before the source is treated as
/// permanently gone and the pipeline shuts down.
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;
