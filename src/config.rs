//! User configuration: TOML file with environment overrides.

use crate::defaults;
use crate::error::{DeckhandError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub gesture: GestureConfig,
    pub voice: VoiceConfig,
    pub fusion: FusionSettings,
}

/// Camera and preview configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// Camera device index (0 = first camera)
    pub camera_index: u32,
    /// Show the live preview window
    pub preview: bool,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    /// Duration of one capture block in seconds
    pub block_secs: u32,
    /// Length of the rolling window in seconds
    pub buffer_secs: u32,
}

/// Gesture recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    /// Swipe threshold as a fraction of normalized frame width
    pub swipe_threshold: f32,
    pub detection_confidence: f32,
    pub tracking_confidence: f32,
}

/// Voice command configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whisper model name (resolved under the cache directory)
    pub model: String,
    /// Explicit model file path; overrides `model` when set
    pub model_path: Option<PathBuf>,
    pub language: String,
    pub beam_size: usize,
    /// Upper bound in milliseconds on the transcription loop's idle wait
    pub idle_wait_ms: u64,
}

/// Command-fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionSettings {
    /// Per-channel cooldown in milliseconds
    pub cooldown_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            preview: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            block_secs: defaults::BLOCK_SECS,
            buffer_secs: defaults::BUFFER_SECS,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold: defaults::SWIPE_THRESHOLD,
            detection_confidence: defaults::DETECTION_CONFIDENCE,
            tracking_confidence: defaults::TRACKING_CONFIDENCE,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            model_path: None,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            beam_size: defaults::BEAM_SIZE,
            idle_wait_ms: defaults::IDLE_WAIT_MS,
        }
    }
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: defaults::COOLDOWN_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML and other
    /// I/O failures propagate.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(DeckhandError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DECKHAND_MODEL → voice.model
    /// - DECKHAND_LANGUAGE → voice.language
    /// - DECKHAND_AUDIO_DEVICE → audio.device
    /// - DECKHAND_CAMERA_INDEX → video.camera_index
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup("DECKHAND_MODEL")
            && !model.is_empty()
        {
            self.voice.model = model;
        }

        if let Some(language) = lookup("DECKHAND_LANGUAGE")
            && !language.is_empty()
        {
            self.voice.language = language;
        }

        if let Some(device) = lookup("DECKHAND_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Some(index) = lookup("DECKHAND_CAMERA_INDEX")
            && let Ok(index) = index.parse::<u32>()
        {
            self.video.camera_index = index;
        }

        self
    }

    /// Check cross-field invariants the type system can't express.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(DeckhandError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.block_secs == 0 {
            return Err(DeckhandError::ConfigInvalidValue {
                key: "audio.block_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.buffer_secs < self.audio.block_secs {
            return Err(DeckhandError::ConfigInvalidValue {
                key: "audio.buffer_secs".to_string(),
                message: "must be at least one block long".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.gesture.swipe_threshold) {
            return Err(DeckhandError::ConfigInvalidValue {
                key: "gesture.swipe_threshold".to_string(),
                message: "must be within [0.0, 1.0] of normalized frame width".to_string(),
            });
        }
        if self.voice.beam_size == 0 {
            return Err(DeckhandError::ConfigInvalidValue {
                key: "voice.beam_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Per-channel cooldown as a duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.fusion.cooldown_ms)
    }

    /// Transcription idle wait as a duration.
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.voice.idle_wait_ms)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/deckhand/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deckhand")
            .join("config.toml")
    }
}
