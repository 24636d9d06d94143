//! Whisper-based speech-to-text transcription.
//!
//! This module provides a Whisper implementation of the Transcriber trait
//! using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed. Without the feature, `WhisperTranscriber` is a stub that
//! errors on use.

use crate::defaults;
use crate::error::{DeckhandError, Result};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use crate::voice::transcriber::{Transcriber, TranscriptSegment};
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for Whisper transcriber.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language hint (e.g., "en")
    pub language: String,
    /// Beam-search width
    pub beam_size: usize,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(defaults::DEFAULT_MODEL),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            beam_size: defaults::BEAM_SIZE,
            threads: None,
        }
    }
}

/// The conventional location of a named ggml model:
/// `~/.cache/deckhand/models/ggml-<name>.bin`.
pub fn default_model_path(model_name: &str) -> PathBuf {
    let filename = format!("ggml-{}.bin", model_name);
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deckhand")
        .join("models")
        .join(filename)
}

/// Validate that a model file exists, with remediation text when it
/// doesn't. Models are never downloaded implicitly.
pub fn require_model(path: &PathBuf) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DeckhandError::TranscriptionModelNotFound {
            path: path.to_string_lossy().to_string(),
        })
    }
}

/// Whisper-based transcriber implementation.
///
/// Uses whisper-rs for speech-to-text on each drained audio window.
/// The WhisperContext is wrapped in a Mutex to ensure thread safety.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper-based transcriber placeholder (without whisper feature).
///
/// This is a stub implementation that returns errors when used.
/// Enable the `whisper` feature to use real transcription.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    config: WhisperConfig,
    model_name: String,
}

fn model_name_from_path(path: &PathBuf) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// # Errors
    /// Returns `TranscriptionModelNotFound` if the model file doesn't exist
    /// and `TranscriptionInferenceFailed` if model loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        require_model(&config.model_path)?;

        let model_name = model_name_from_path(&config.model_path);

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config.model_path.to_str().ok_or_else(|| {
                DeckhandError::TranscriptionInferenceFailed {
                    message: "Invalid UTF-8 in model path".to_string(),
                }
            })?,
            context_params,
        )
        .map_err(|e| DeckhandError::TranscriptionInferenceFailed {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber (stub implementation).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        require_model(&config.model_path)?;
        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

/// Convert i16 audio samples to f32 normalized to [-1.0, 1.0].
///
/// Whisper expects audio in f32 format normalized to the range [-1.0, 1.0].
/// Input is 16-bit PCM audio where samples range from -32768 to 32767.
pub fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[i16]) -> Result<Vec<TranscriptSegment>> {
        let audio_f32 = convert_audio(audio);

        let context =
            self.context
                .lock()
                .map_err(|e| DeckhandError::TranscriptionInferenceFailed {
                    message: format!("Failed to acquire context lock: {}", e),
                })?;

        let mut state =
            context
                .create_state()
                .map_err(|e| DeckhandError::TranscriptionInferenceFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: self.config.beam_size as i32,
            patience: -1.0,
        });

        params.set_language(Some(&self.config.language));

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Disable printing to stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| DeckhandError::TranscriptionInferenceFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            segments.push(TranscriptSegment::new(segment.to_string()));
        }
        Ok(segments)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(not(feature = "whisper"))]
impl crate::voice::transcriber::Transcriber for WhisperTranscriber {
    fn transcribe(
        &self,
        _audio: &[i16],
    ) -> Result<Vec<crate::voice::transcriber::TranscriptSegment>> {
        Err(DeckhandError::TranscriptionInferenceFailed {
            message: "deckhand was built without the whisper feature; \
                      rebuild with --features whisper"
                .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WhisperConfig::default();
        assert_eq!(config.language, "en");
        assert_eq!(config.beam_size, 5);
        assert!(config.threads.is_none());
    }

    #[test]
    fn test_default_model_path_shape() {
        let path = default_model_path("small");
        let text = path.to_string_lossy();
        assert!(text.ends_with("ggml-small.bin"), "got {}", text);
        assert!(text.contains("deckhand"));
    }

    #[test]
    fn test_require_model_missing_file() {
        let path = PathBuf::from("/nonexistent/ggml-small.bin");
        let result = require_model(&path);
        match result {
            Err(DeckhandError::TranscriptionModelNotFound { path }) => {
                assert!(path.contains("ggml-small.bin"));
            }
            _ => panic!("Expected TranscriptionModelNotFound"),
        }
    }

    #[test]
    fn test_new_with_missing_model_fails() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/ggml-small.bin"),
            ..Default::default()
        };
        assert!(matches!(
            WhisperTranscriber::new(config),
            Err(DeckhandError::TranscriptionModelNotFound { .. })
        ));
    }

    #[test]
    fn test_convert_audio_normalizes_range() {
        let samples = vec![0i16, i16::MAX, i16::MIN];
        let converted = convert_audio(&samples);

        assert_eq!(converted[0], 0.0);
        assert!((converted[1] - 0.99997).abs() < 0.001);
        assert_eq!(converted[2], -1.0);
    }

    #[test]
    fn test_convert_audio_empty() {
        assert!(convert_audio(&[]).is_empty());
    }

    #[test]
    fn test_model_name_from_path() {
        let path = PathBuf::from("/models/ggml-small.bin");
        assert_eq!(model_name_from_path(&path), "ggml-small");
    }
}
