//! Default configuration constants for deckhand.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Duration of one audio capture block in seconds.
///
/// The microphone delivers one block per callback; the block is the unit
/// the ring buffer stores and evicts.
pub const BLOCK_SECS: u32 = 1;

/// Length of the rolling audio window in seconds.
///
/// The ring buffer holds at most `BUFFER_SECS / BLOCK_SECS` blocks; older
/// blocks are evicted. 5 seconds is enough to catch a complete spoken
/// command without re-transcribing stale speech.
pub const BUFFER_SECS: u32 = 5;

/// Minimum time in milliseconds between two accepted actions on one channel.
///
/// A single physical swipe or phrase spans several frames/segments; the
/// cooldown collapses it into one slide jump.
pub const COOLDOWN_MS: u64 = 500;

/// Horizontal swipe threshold as a fraction of normalized frame width.
///
/// A hand must move more than this between two consecutive observations
/// to count as a swipe.
pub const SWIPE_THRESHOLD: f32 = 0.1;

/// Hand detection confidence threshold (0.0 to 1.0).
pub const DETECTION_CONFIDENCE: f32 = 0.7;

/// Hand tracking confidence threshold (0.0 to 1.0).
pub const TRACKING_CONFIDENCE: f32 = 0.7;

/// Maximum number of hands tracked per frame.
///
/// Exactly one: the gesture state machine keeps a single position history,
/// and two simultaneously tracked hands would produce conflicting deltas.
pub const MAX_HANDS: usize = 1;

/// Default Whisper model name.
///
/// "small" matches the accuracy/latency point tuned for short command
/// phrases. Use "small.en" for English-only optimized transcription.
pub const DEFAULT_MODEL: &str = "small";

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Beam-search width for transcription.
pub const BEAM_SIZE: usize = 5;

/// Upper bound in milliseconds for the transcription loop's idle wait.
///
/// When the ring buffer is empty the loop blocks on the buffer's condvar;
/// a push wakes it immediately, this cap bounds the wait otherwise.
pub const IDLE_WAIT_MS: u64 = 500;

/// Number of samples in one capture block.
pub fn block_samples(sample_rate: u32, block_secs: u32) -> usize {
    (sample_rate * block_secs) as usize
}

/// Ring buffer capacity in blocks for the given window and block durations.
pub fn buffer_blocks(buffer_secs: u32, block_secs: u32) -> usize {
    (buffer_secs / block_secs.max(1)).max(1) as usize
}
