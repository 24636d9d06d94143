//! Speech-to-text contract and the voice-command pipeline.

pub mod pipeline;
pub mod transcriber;
pub mod whisper;
