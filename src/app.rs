//! Application entry point: wires the collaborators into the fusion loop.
//!
//! Build order follows the startup-failure contract: the camera and the
//! detector are opened before anything else so a missing device aborts the
//! process with nothing started yet; audio capture begins inside the
//! fusion loop, before the activities spawn.

use crate::audio::capture::AudioCapture;
use crate::audio::ring_buffer::AudioRingBuffer;
use crate::config::Config;
use crate::defaults;
use crate::error::{DeckhandError, Result};
use crate::fusion::dispatcher::ActionDispatcher;
use crate::fusion::orchestrator::{FusionConfig, FusionLoop, FusionParts};
use crate::gesture::detector::{DetectorConfig, open_detector};
use crate::video::camera::open_camera;
use crate::video::preview::{NullPreview, Preview};
use crate::voice::whisper::{WhisperConfig, WhisperTranscriber, default_model_path};
use std::sync::Arc;

/// Preview window dimensions before the first frame arrives.
#[cfg(feature = "preview")]
const PREVIEW_WIDTH: usize = 640;
#[cfg(feature = "preview")]
const PREVIEW_HEIGHT: usize = 480;

/// Run the fusion loop: camera + microphone in, arrow keys out.
///
/// # Arguments
/// * `config` - Base configuration (can be overridden by CLI args)
/// * `device` - Optional audio device override from CLI
/// * `camera` - Optional camera index override from CLI
/// * `model` - Optional model override from CLI
/// * `language` - Optional language override from CLI
/// * `buffer` - Optional rolling-window length override (seconds)
/// * `quiet` - Suppress status messages
///
/// # Returns
/// Ok(()) on operator quit; an error when a device cannot be opened at
/// startup or the camera fails mid-run.
pub fn run_control_command(
    mut config: Config,
    device: Option<String>,
    camera: Option<u32>,
    model: Option<String>,
    language: Option<String>,
    buffer: Option<u32>,
    quiet: bool,
) -> Result<()> {
    // Apply CLI overrides
    if let Some(d) = device {
        config.audio.device = Some(d);
    }
    if let Some(c) = camera {
        config.video.camera_index = c;
    }
    if let Some(m) = model {
        config.voice.model = m;
    }
    if let Some(l) = language {
        config.voice.language = l;
    }
    if let Some(b) = buffer {
        config.audio.buffer_secs = b;
    }

    config.validate()?;

    // Suppress noisy JACK/ALSA warnings before audio init
    #[cfg(feature = "cpal-audio")]
    crate::audio::capture::suppress_audio_warnings();

    // Devices first: a missing camera or detector aborts here, before any
    // activity exists.
    let frames = open_camera(&config.video)?;
    let detector = open_detector(&DetectorConfig::from_gesture_config(&config.gesture))?;
    let preview = build_preview(&config)?;

    let ring = Arc::new(AudioRingBuffer::new(defaults::buffer_blocks(
        config.audio.buffer_secs,
        config.audio.block_secs,
    )));
    let capture = build_capture(&config, ring.clone())?;
    let transcriber = build_transcriber(&config)?;

    let dispatcher = Arc::new(ActionDispatcher::system().with_quiet(quiet));

    let fusion = FusionLoop::new(FusionConfig {
        cooldown: config.cooldown(),
        swipe_threshold: config.gesture.swipe_threshold,
        idle_wait: config.idle_wait(),
        quiet,
    });

    fusion.run(FusionParts {
        frames,
        detector,
        preview,
        capture,
        ring,
        transcriber,
        dispatcher,
    })
}

fn build_preview(config: &Config) -> Result<Box<dyn Preview>> {
    if !config.video.preview {
        return Ok(Box::new(NullPreview));
    }

    #[cfg(feature = "preview")]
    {
        let preview = crate::video::preview::MinifbPreview::new(PREVIEW_WIDTH, PREVIEW_HEIGHT)?;
        Ok(Box::new(preview))
    }
    #[cfg(not(feature = "preview"))]
    {
        eprintln!("deckhand: built without the preview feature, running headless");
        Ok(Box::new(NullPreview))
    }
}

#[cfg(feature = "cpal-audio")]
fn build_capture(config: &Config, ring: Arc<AudioRingBuffer>) -> Result<Box<dyn AudioCapture>> {
    let capture = crate::audio::capture::CpalAudioCapture::new(
        config.audio.device.as_deref(),
        ring,
        config.audio.sample_rate,
        defaults::block_samples(config.audio.sample_rate, config.audio.block_secs),
    )?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "cpal-audio"))]
fn build_capture(_config: &Config, _ring: Arc<AudioRingBuffer>) -> Result<Box<dyn AudioCapture>> {
    Err(DeckhandError::AudioCapture {
        message: "deckhand was built without the cpal-audio feature; \
                  rebuild with --features cpal-audio"
            .to_string(),
    })
}

fn build_transcriber(config: &Config) -> Result<Arc<WhisperTranscriber>> {
    let model_path = config
        .voice
        .model_path
        .clone()
        .unwrap_or_else(|| default_model_path(&config.voice.model));

    let whisper_config = WhisperConfig {
        model_path,
        language: config.voice.language.clone(),
        beam_size: config.voice.beam_size,
        threads: None,
    };

    match WhisperTranscriber::new(whisper_config) {
        Ok(transcriber) => Ok(Arc::new(transcriber)),
        Err(e @ DeckhandError::TranscriptionModelNotFound { .. }) => {
            eprintln!(
                "deckhand: download a ggml Whisper model and place it at the path above, \
                 or point voice.model_path at one"
            );
            Err(e)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_aborts_on_invalid_config() {
        let mut config = Config::default();
        config.audio.block_secs = 0;

        let result = run_control_command(config, None, None, None, None, None, true);
        assert!(matches!(
            result,
            Err(DeckhandError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_run_aborts_before_activities_without_camera_backend() {
        // No camera backend is bundled: startup must fail with the device
        // error, per the fatal-at-startup contract.
        let result = run_control_command(Config::default(), None, None, None, None, None, true);
        assert!(matches!(
            result,
            Err(DeckhandError::CameraUnavailable { .. })
        ));
    }

    #[test]
    fn test_buffer_override_applies_before_validation() {
        let mut config = Config::default();
        config.audio.block_secs = 2;
        // Override shrinks the window below one block: validation rejects.
        let result = run_control_command(config, None, None, None, None, Some(1), true);
        assert!(matches!(
            result,
            Err(DeckhandError::ConfigInvalidValue { key, .. }) if key == "audio.buffer_secs"
        ));
    }

    #[test]
    fn test_build_transcriber_reports_missing_model() {
        let mut config = Config::default();
        config.voice.model_path = Some(std::path::PathBuf::from("/nonexistent/ggml-x.bin"));

        let result = build_transcriber(&config);
        assert!(matches!(
            result,
            Err(DeckhandError::TranscriptionModelNotFound { .. })
        ));
    }
}
