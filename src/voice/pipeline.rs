//! Voice-command pipeline: rolling audio window → transcriber → actions.
//!
//! Runs on its own thread for the life of the process. Each iteration
//! drains the ring buffer, transcribes the window, classifies every segment
//! into a command, and dispatches the ones the VOICE cooldown lets through.
//! Audio is lossy by design: a failed window is discarded, never retried,
//! since later speech is not replayed.

use crate::audio::ring_buffer::AudioRingBuffer;
use crate::fusion::action::{Action, Channel};
use crate::fusion::cooldown::CooldownGate;
use crate::fusion::dispatcher::ActionDispatcher;
use crate::voice::transcriber::Transcriber;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Classify one transcript segment into a navigation command.
///
/// The text is trimmed and lowercased; "next" anywhere in the phrase wins
/// over "back" when both appear.
pub fn parse_command(text: &str) -> Option<Action> {
    let command = text.trim().to_lowercase();
    if command.contains("next") {
        Some(Action::Next)
    } else if command.contains("back") {
        Some(Action::Previous)
    } else {
        None
    }
}

/// Configuration for the voice pipeline.
#[derive(Debug, Clone)]
pub struct VoicePipelineConfig {
    /// Upper bound on the empty-buffer wait per iteration.
    pub idle_wait: Duration,
    /// Suppress recognized-command echo on stderr.
    pub quiet: bool,
}

impl Default for VoicePipelineConfig {
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_millis(crate::defaults::IDLE_WAIT_MS),
            quiet: false,
        }
    }
}

/// The transcription activity.
pub struct VoicePipeline {
    ring: Arc<AudioRingBuffer>,
    transcriber: Arc<dyn Transcriber>,
    gate: Arc<CooldownGate>,
    dispatcher: Arc<ActionDispatcher>,
    config: VoicePipelineConfig,
}

impl VoicePipeline {
    pub fn new(
        ring: Arc<AudioRingBuffer>,
        transcriber: Arc<dyn Transcriber>,
        gate: Arc<CooldownGate>,
        dispatcher: Arc<ActionDispatcher>,
        config: VoicePipelineConfig,
    ) -> Self {
        Self {
            ring,
            transcriber,
            gate,
            dispatcher,
            config,
        }
    }

    /// Loop until `running` goes false.
    ///
    /// The wait on the ring buffer is bounded by `idle_wait`, so the flag
    /// is observed at that cadence even during total silence.
    pub fn run(&self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            self.tick();
        }
    }

    /// One pipeline iteration: wait for audio, drain, transcribe, dispatch.
    ///
    /// Returns the number of actions dispatched, which is 0 on an idle
    /// timeout, an empty window, a transcriber error, or a fully suppressed
    /// window.
    fn tick(&self) -> usize {
        if !self.ring.wait_until_nonempty(self.config.idle_wait) {
            return 0;
        }

        // The window is consumed atomically; blocks pushed from here on
        // belong to the next window.
        let window = self.ring.drain();
        if window.is_empty() {
            return 0;
        }

        let segments = match self.transcriber.transcribe(&window) {
            Ok(segments) => segments,
            Err(e) => {
                // The window's speech is lost; there is nothing to retry against.
                eprintln!("deckhand: transcription failed, window discarded: {}", e);
                return 0;
            }
        };

        let mut dispatched = 0;
        for segment in segments {
            let Some(action) = parse_command(&segment.text) else {
                continue;
            };
            if !self.config.quiet {
                eprintln!("deckhand: heard \"{}\"", segment.text.trim());
            }
            if !self.gate.allow(Channel::Voice) {
                continue;
            }
            match self.dispatcher.dispatch(action) {
                Ok(()) => dispatched += 1,
                Err(e) => eprintln!("deckhand: key injection failed: {}", e),
            }
        }
        dispatched
    }
}
