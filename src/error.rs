//! Error types for deckhand.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckhandError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Video errors
    #[error("Camera unavailable: {message}")]
    CameraUnavailable { message: String },

    #[error("Camera frame read failed: {message}")]
    FrameRead { message: String },

    #[error("Hand detector unavailable: {message}")]
    DetectorUnavailable { message: String },

    #[error("Hand detection failed: {message}")]
    Detection { message: String },

    #[error("Preview window error: {message}")]
    Preview { message: String },

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    AudioFormatMismatch { expected: String, actual: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription inference failed: {message}")]
    TranscriptionInferenceFailed { message: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    // Keystroke injection errors
    #[error("Key injection tool not found: {tool}")]
    InjectionToolNotFound { tool: String },

    #[error("Key injection permission denied: {message}")]
    InjectionPermissionDenied { message: String },

    #[error("Key injection failed: {message}")]
    InjectionFailed { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DeckhandError>;
