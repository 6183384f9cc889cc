use crate::error::{Result, SeqscribeError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real engine vs mock). The
/// worker pool invokes `process` concurrently from multiple threads, so
/// implementations must be safe to call in parallel. Engines that are not
/// internally parallel-safe should be wrapped in [`SerialTranscriber`].
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at the pipeline sample rate
    ///
    /// # Returns
    /// Transcribed text or error. May be slow (hundreds of milliseconds).
    fn process(&self, audio: &[i16]) -> Result<String>;

    /// Get the name of the loaded model.
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready.
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across workers.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn process(&self, audio: &[i16]) -> Result<String> {
        (**self).process(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Serializes access to a transcriber that is not safe to invoke from
/// multiple threads at once.
///
/// The worker pool stays parallel on everything else (dequeue, submit);
/// only the engine invocation itself is funneled through the mutex.
pub struct SerialTranscriber<T> {
    inner: Mutex<T>,
    model_name: String,
}

impl<T: Transcriber> SerialTranscriber<T> {
    /// Wrap a transcriber, serializing all `process` calls.
    pub fn new(inner: T) -> Self {
        let model_name = inner.model_name().to_string();
        Self {
            inner: Mutex::new(inner),
            model_name,
        }
    }
}

impl<T: Transcriber> Transcriber for SerialTranscriber<T> {
    fn process(&self, audio: &[i16]) -> Result<String> {
        let guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.process(audio)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        let guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.is_ready()
    }
}

/// Mock transcriber for testing.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            delay: None,
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on process.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure a fixed processing delay, simulating a slow engine.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Transcriber for MockTranscriber {
    fn process(&self, _audio: &[i16]) -> Result<String> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.should_fail {
            Err(SeqscribeError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
