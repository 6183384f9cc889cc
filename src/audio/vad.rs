//! Voice Activity Detection (VAD).
//!
//! The pipeline treats VAD as a pluggable predicate: given one window of
//! samples, decide whether it contains speech worth transcribing. The
//! default implementation thresholds on RMS energy.

use crate::defaults;

/// Pure predicate deciding whether an audio window contains speech.
///
/// Implementations must not need state between calls; the segmenter may
/// invoke this from its capture loop at window rate.
pub trait SpeechDetector: Send {
    /// Returns true if the window should be transcribed.
    fn is_speech(&self, samples: &[i16], sample_rate: u32) -> bool;
}

/// RMS-energy speech detector.
///
/// A window whose root-mean-square level exceeds the threshold is classified
/// as speech. Simple, fast, and good enough to keep silent windows away from
/// the transcription engine.
#[derive(Debug, Clone, Copy)]
pub struct RmsDetector {
    threshold: f32,
}

impl RmsDetector {
    /// Create a detector with the given RMS threshold (0.0 to 1.0).
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for RmsDetector {
    fn default() -> Self {
        Self::new(defaults::VAD_THRESHOLD)
    }
}

impl SpeechDetector for RmsDetector {
    fn is_speech(&self, samples: &[i16], _sample_rate: u32) -> bool {
        calculate_rms(samples) > self.threshold
    }
}

/// Calculate the normalized RMS level (0.0 to 1.0) of 16-bit PCM samples.
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}
