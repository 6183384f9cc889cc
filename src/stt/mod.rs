//! Speech-to-text collaborator seam.

pub mod transcriber;

pub use transcriber::{MockTranscriber, SerialTranscriber, Transcriber};
