use crate::error::{Result, SeqscribeError};

/// Trait for audio source devices.
///
/// This trait allows swapping implementations (real audio device vs mock).
/// The pipeline owns the read loop; implementations only need to surface
/// samples and failures.
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read the next chunk of audio samples, blocking until data is available.
    ///
    /// An empty chunk from a finite source signals end of input. Errors must
    /// be surfaced, never silently looped on.
    fn read_chunk(&mut self) -> Result<Vec<i16>>;

    /// Whether this source runs out (file/pipe) rather than streaming forever
    /// (microphone). Finite sources end capture on an empty read.
    fn is_finite(&self) -> bool {
        false
    }
}

/// Mock audio source for testing.
///
/// Replays a fixed set of chunks, then returns empty reads. Failures can be
/// injected per operation.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    chunks: Vec<Vec<i16>>,
    cursor: usize,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with no chunks.
    pub fn new() -> Self {
        Self {
            is_started: false,
            chunks: Vec::new(),
            cursor: 0,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to replay the given chunks in order.
    pub fn with_chunks(mut self, chunks: Vec<Vec<i16>>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on every read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for injected failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the audio source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(SeqscribeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(SeqscribeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        let chunk = self.chunks.get(self.cursor).cloned().unwrap_or_default();
        if !chunk.is_empty() {
            self.cursor += 1;
        }
        Ok(chunk)
    }

    fn is_finite(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_chunks_in_order() {
        let mut source =
            MockAudioSource::new().with_chunks(vec![vec![1i16, 2, 3], vec![4i16, 5, 6]]);

        assert_eq!(source.read_chunk().unwrap(), vec![1i16, 2, 3]);
        assert_eq!(source.read_chunk().unwrap(), vec![4i16, 5, 6]);
        // Exhausted: empty reads from here on
        assert!(source.read_chunk().unwrap().is_empty());
        assert!(source.read_chunk().unwrap().is_empty());
    }

    #[test]
    fn test_mock_read_failure() {
        let mut source = MockAudioSource::new()
            .with_read_failure()
            .with_error_message("buffer overflow");

        match source.read_chunk() {
            Err(SeqscribeError::AudioCapture { message }) => {
                assert_eq!(message, "buffer overflow");
            }
            other => panic!("Expected AudioCapture error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_mock_start_stop_state() {
        let mut source = MockAudioSource::new();
        assert!(!source.is_started());

        source.start().unwrap();
        assert!(source.is_started());

        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_start_failure() {
        let mut source = MockAudioSource::new().with_start_failure();
        assert!(source.start().is_err());
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_is_finite() {
        let source = MockAudioSource::new();
        assert!(source.is_finite());
    }

    #[test]
    fn test_audio_source_trait_is_object_safe() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_chunks(vec![vec![7i16; 4]]));

        source.start().unwrap();
        assert_eq!(source.read_chunk().unwrap(), vec![7i16; 4]);
        source.stop().unwrap();
    }
}
