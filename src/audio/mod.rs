//! Audio collaborators: capture source and voice-activity detection.

pub mod source;
pub mod vad;

pub use source::{AudioSource, MockAudioSource};
pub use vad::{RmsDetector, SpeechDetector, calculate_rms};
