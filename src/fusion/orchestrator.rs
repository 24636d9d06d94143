//! Process-wide orchestrator for the three concurrent activities.
//!
//! The video-gesture loop runs on the calling thread and is the only
//! activity allowed to touch the preview surface. Audio capture is driven
//! by the device's own callback. Transcription runs on a spawned thread.
//! All three emit actions through one shared dispatcher.

use crate::audio::capture::AudioCapture;
use crate::audio::ring_buffer::AudioRingBuffer;
use crate::clock::{Clock, SystemClock};
use crate::defaults;
use crate::error::Result;
use crate::fusion::cooldown::CooldownGate;
use crate::fusion::dispatcher::ActionDispatcher;
use crate::gesture::detector::HandDetector;
use crate::gesture::tracker::GestureTracker;
use crate::video::camera::FrameSource;
use crate::video::preview::{Preview, PreviewEvent};
use crate::voice::pipeline::{VoicePipeline, VoicePipelineConfig};
use crate::voice::transcriber::Transcriber;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for the fusion loop.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Per-channel cooldown between accepted actions.
    pub cooldown: Duration,
    /// Swipe threshold as a fraction of normalized frame width.
    pub swipe_threshold: f32,
    /// Upper bound on the transcription loop's empty-buffer wait.
    pub idle_wait: Duration,
    /// Suppress status output.
    pub quiet: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(defaults::COOLDOWN_MS),
            swipe_threshold: defaults::SWIPE_THRESHOLD,
            idle_wait: Duration::from_millis(defaults::IDLE_WAIT_MS),
            quiet: false,
        }
    }
}

/// Everything the fusion loop drives: the collaborators for both
/// modalities plus the shared dispatcher.
pub struct FusionParts {
    pub frames: Box<dyn FrameSource>,
    pub detector: Box<dyn HandDetector>,
    pub preview: Box<dyn Preview>,
    pub capture: Box<dyn AudioCapture>,
    pub ring: Arc<AudioRingBuffer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub dispatcher: Arc<ActionDispatcher>,
}

/// The process-wide orchestrator.
pub struct FusionLoop {
    config: FusionConfig,
    clock: Arc<dyn Clock>,
}

impl FusionLoop {
    /// Creates a fusion loop driven by the system clock.
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run until the operator quits or the camera fails.
    ///
    /// Startup order matters: audio capture starts before any activity is
    /// spawned, so a dead microphone aborts the process with nothing to
    /// tear down. The video loop then runs on this thread; returning from
    /// it, cleanly or not, shuts the audio activities down.
    ///
    /// # Errors
    /// Returns the startup error when a device cannot be opened, or the
    /// frame-read/preview error that ended the loop. Operator quit returns
    /// `Ok(())`.
    pub fn run(self, mut parts: FusionParts) -> Result<()> {
        let gate = Arc::new(CooldownGate::with_clock(
            self.config.cooldown,
            self.clock.clone(),
        ));

        // Fatal before any activity starts.
        parts.capture.start()?;

        let running = Arc::new(AtomicBool::new(true));

        let voice = VoicePipeline::new(
            parts.ring.clone(),
            parts.transcriber.clone(),
            gate.clone(),
            parts.dispatcher.clone(),
            VoicePipelineConfig {
                idle_wait: self.config.idle_wait,
                quiet: self.config.quiet,
            },
        );
        let voice_running = running.clone();
        let voice_handle = thread::Builder::new()
            .name("deckhand-voice".to_string())
            .spawn(move || voice.run(&voice_running))
            .map_err(|e| crate::error::DeckhandError::Other(format!(
                "Failed to spawn transcription thread: {}",
                e
            )))?;

        if !self.config.quiet {
            eprintln!("deckhand: listening (say \"next slide\" or \"go back\", press 'q' to quit)");
        }

        let result = self.video_loop(
            &mut *parts.frames,
            &mut *parts.detector,
            &mut *parts.preview,
            gate,
            &parts.dispatcher,
            &running,
        );

        // Structured teardown: flip the flag, wake the condvar, give the
        // transcription thread a bounded window to notice, then detach it.
        running.store(false, Ordering::SeqCst);
        parts.ring.wake_all();
        join_with_deadline(voice_handle, Duration::from_secs(1));

        if let Err(e) = parts.capture.stop() {
            eprintln!("deckhand: failed to stop audio capture: {}", e);
        }

        result
    }

    /// The video-gesture activity: block on each frame, detect, track,
    /// dispatch, render.
    fn video_loop(
        &self,
        frames: &mut dyn FrameSource,
        detector: &mut dyn HandDetector,
        preview: &mut dyn Preview,
        gate: Arc<CooldownGate>,
        dispatcher: &ActionDispatcher,
        running: &AtomicBool,
    ) -> Result<()> {
        let mut tracker =
            GestureTracker::new(gate).with_threshold(self.config.swipe_threshold);

        loop {
            if !running.load(Ordering::SeqCst) {
                return Ok(());
            }

            // A single failed read tears the whole process down: the video
            // loop is the liveness heartbeat.
            let frame = match frames.read() {
                Ok(frame) => frame,
                Err(e) => {
                    eprintln!("deckhand: failed to read from camera: {}", e);
                    return Err(e);
                }
            };

            let observation = match detector.detect(&frame) {
                Ok(observation) => observation,
                Err(e) => {
                    // A stumbling detector skips the frame, nothing more.
                    eprintln!("deckhand: hand detection failed: {}", e);
                    None
                }
            };

            // Frames without a hand leave the tracker untouched: the stale
            // position carries the delta across brief dropouts.
            if let Some(observation) = &observation
                && let Some(action) = tracker.observe(observation)
                && let Err(e) = dispatcher.dispatch(action)
            {
                eprintln!("deckhand: key injection failed: {}", e);
            }

            match preview.render(&frame, observation.as_ref())? {
                PreviewEvent::Quit => return Ok(()),
                PreviewEvent::Continue => {}
            }
        }
    }
}

/// Join a thread, polling against a deadline; past it the handle is
/// dropped, detaching the thread to die with the process.
fn join_with_deadline(handle: thread::JoinHandle<()>, deadline: Duration) {
    let poll_interval = Duration::from_millis(50);
    let give_up_at = Instant::now() + deadline;

    while !handle.is_finished() {
        if Instant::now() >= give_up_at {
            eprintln!("deckhand: shutdown timeout — transcription thread still running, detaching");
            return;
        }
        thread::sleep(poll_interval);
    }

    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        eprintln!("deckhand: transcription thread panicked: {msg}");
    }
}
