use crate::error::{DeckhandError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One transcribed piece of speech from a single audio window.
///
/// The engine's confidence and timing metadata stay inside the backend;
/// the fusion core only reads text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio window to an ordered sequence of segments.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at 16kHz mono
    fn transcribe(&self, audio: &[i16]) -> Result<Vec<TranscriptSegment>>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across threads.
impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[i16]) -> Result<Vec<TranscriptSegment>> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing.
///
/// Plays back a queue of per-window results; once the queue is exhausted,
/// windows transcribe to nothing. Interior mutability keeps the queue
/// usable behind `&self` from the pipeline thread.
#[derive(Debug, Default)]
pub struct MockTranscriber {
    model_name: String,
    windows: Mutex<VecDeque<Result<Vec<TranscriptSegment>>>>,
    seen_windows: Mutex<Vec<usize>>,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            windows: Mutex::new(VecDeque::new()),
            seen_windows: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    /// Queue the segments returned for the next transcribed window.
    pub fn with_segments(self, texts: &[&str]) -> Self {
        if let Ok(mut windows) = self.windows.lock() {
            windows.push_back(Ok(texts
                .iter()
                .map(|text| TranscriptSegment::new(*text))
                .collect()));
        }
        self
    }

    /// Queue a failing window.
    pub fn with_window_failure(self, message: &str) -> Self {
        if let Ok(mut windows) = self.windows.lock() {
            windows.push_back(Err(DeckhandError::Transcription {
                message: message.to_string(),
            }));
        }
        self
    }

    /// Configure the mock to fail on every transcribe call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Sample counts of the windows passed to transcribe, in order.
    pub fn seen_windows(&self) -> Vec<usize> {
        match self.seen_windows.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio: &[i16]) -> Result<Vec<TranscriptSegment>> {
        if let Ok(mut seen) = self.seen_windows.lock() {
            seen.push(audio.len());
        }
        if self.should_fail {
            return Err(DeckhandError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        self.windows
            .lock()
            .ok()
            .and_then(|mut windows| windows.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
