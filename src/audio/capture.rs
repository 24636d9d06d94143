//! Microphone capture.
//!
//! The capture collaborator owns the device callback: each delivery is cut
//! into fixed-duration blocks and pushed straight into the shared ring
//! buffer. The callback does no other work; blocking here drops samples.
//!
//! The real backend uses CPAL (Cross-Platform Audio Library) behind the
//! `cpal-audio` feature.

use crate::audio::ring_buffer::AudioRingBuffer;
use crate::error::Result;

/// Trait for microphone capture devices.
///
/// Starting begins delivery into the ring buffer handed to the
/// implementation at construction; stopping ends it. This trait allows
/// swapping implementations (real audio device vs mock).
pub trait AudioCapture: Send {
    /// Start capturing audio into the ring buffer.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio.
    fn stop(&mut self) -> Result<()>;
}

/// Cut whole blocks off the front of `pending` and push each into the ring.
///
/// Leftover samples below one block length stay in `pending` for the next
/// delivery, so every pushed block has exactly `block_samples` samples.
pub(crate) fn cut_blocks(pending: &mut Vec<i16>, ring: &AudioRingBuffer, block_samples: usize) {
    if block_samples == 0 {
        return;
    }
    while pending.len() >= block_samples {
        let rest = pending.split_off(block_samples);
        let block = std::mem::replace(pending, rest);
        ring.push(block);
    }
}

/// Mock capture for testing.
#[derive(Debug, Clone)]
pub struct MockAudioCapture {
    is_started: bool,
    should_fail_start: bool,
    should_fail_stop: bool,
    error_message: String,
}

impl MockAudioCapture {
    /// Create a new mock capture with default settings.
    pub fn new() -> Self {
        Self {
            is_started: false,
            should_fail_start: false,
            should_fail_stop: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on stop.
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the capture is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for MockAudioCapture {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(crate::error::DeckhandError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            Err(crate::error::DeckhandError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = false;
            Ok(())
        }
    }
}

#[cfg(feature = "cpal-audio")]
pub use cpal_capture::{CpalAudioCapture, list_devices, suppress_audio_warnings};

#[cfg(feature = "cpal-audio")]
mod cpal_capture {
    use super::{AudioCapture, cut_blocks};
    use crate::audio::ring_buffer::AudioRingBuffer;
    use crate::error::{DeckhandError, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Run a closure with stderr temporarily redirected to /dev/null.
    ///
    /// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
    /// when probing audio backends. The messages are harmless but confusing
    /// to users.
    ///
    /// # Safety
    /// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2
    /// (stderr). Safe as long as no other thread is concurrently
    /// manipulating fd 2.
    fn with_suppressed_stderr<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        unsafe {
            let saved_fd = libc::dup(2);
            let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
            if saved_fd >= 0 && devnull >= 0 {
                libc::dup2(devnull, 2);
                libc::close(devnull);
            }

            let result = f();

            if saved_fd >= 0 {
                libc::dup2(saved_fd, 2);
                libc::close(saved_fd);
            }

            result
        }
    }

    /// Suppress noisy JACK/ALSA error messages that occur during audio
    /// backend probing.
    ///
    /// # Safety
    /// This modifies environment variables which is safe when called before
    /// spawning threads.
    pub fn suppress_audio_warnings() {
        // SAFETY: Called at startup before any threads are spawned
        unsafe {
            std::env::set_var("JACK_NO_START_SERVER", "1");
            std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
            std::env::set_var("PIPEWIRE_DEBUG", "0");
            std::env::set_var("ALSA_DEBUG", "0");
            std::env::set_var("PW_LOG", "0");
        }
    }

    /// Preferred device names for GNOME/PipeWire environments.
    const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

    /// Device name patterns to filter out (not useful for voice input).
    const FILTERED_PATTERNS: &[&str] = &[
        "surround",
        "front:",
        "rear:",
        "center:",
        "side:",
        "Digital Output",
        "HDMI",
        "S/PDIF",
    ];

    fn should_filter_device(name: &str) -> bool {
        let lower = name.to_lowercase();
        FILTERED_PATTERNS
            .iter()
            .any(|pattern| lower.contains(&pattern.to_lowercase()))
    }

    fn is_preferred_device(name: &str) -> bool {
        let lower = name.to_lowercase();
        PREFERRED_DEVICES
            .iter()
            .any(|pref| lower.contains(&pref.to_lowercase()))
    }

    /// List all available audio input devices with filtering and
    /// recommendations.
    ///
    /// # Returns
    /// A vector of device names, with preferred devices marked with
    /// "\[recommended\]". Filters out obviously unusable devices (surround
    /// channels, HDMI, etc.).
    ///
    /// # Errors
    /// Returns `DeckhandError::AudioCapture` if device enumeration fails.
    pub fn list_devices() -> Result<Vec<String>> {
        let (host, devices) = with_suppressed_stderr(|| {
            let host = cpal::default_host();
            let devices = host.input_devices();
            (host, devices)
        });
        let _ = host; // keep host alive while iterating devices
        let devices = devices.map_err(|e| DeckhandError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

        let mut device_names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                if should_filter_device(&name) {
                    continue;
                }
                if is_preferred_device(&name) {
                    device_names.push(format!("{} [recommended]", name));
                } else {
                    device_names.push(name);
                }
            }
        }

        Ok(device_names)
    }

    /// Get the best default input device, preferring PipeWire/PulseAudio.
    ///
    /// This ensures we respect the desktop's audio device selection.
    fn get_best_default_device() -> Result<cpal::Device> {
        with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Ok(devices) = host.input_devices() {
                for device in devices {
                    if let Ok(name) = device.name()
                        && is_preferred_device(&name)
                    {
                        return Ok(device);
                    }
                }
            }

            host.default_input_device()
                .ok_or_else(|| DeckhandError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })
        })
    }

    /// Wrapper for cpal::Stream to make it Send.
    ///
    /// SAFETY: The stream is only accessed from a single thread at a time
    /// through the Mutex wrapper in CpalAudioCapture. The stream methods are
    /// called synchronously and don't cross thread boundaries unsafely.
    struct SendableStream(cpal::Stream);

    unsafe impl Send for SendableStream {}

    /// Real microphone capture using CPAL.
    ///
    /// Captures 16-bit PCM at 16kHz mono and pushes one ring-buffer block
    /// per `block_samples` captured samples. Tries the preferred format
    /// first (i16/16kHz/mono), then f32, then the device's native config
    /// with software conversion (channel mixing + resampling).
    pub struct CpalAudioCapture {
        device: cpal::Device,
        stream: Arc<Mutex<Option<SendableStream>>>,
        ring: Arc<AudioRingBuffer>,
        pending: Arc<Mutex<Vec<i16>>>,
        callback_count: Arc<AtomicU64>,
        sample_rate: u32,
        block_samples: usize,
    }

    impl CpalAudioCapture {
        /// Create a new CPAL capture pushing into the given ring buffer.
        ///
        /// # Arguments
        /// * `device_name` - Optional device name. If None, uses the best
        ///   default input device.
        /// * `ring` - Shared ring buffer receiving capture blocks.
        /// * `sample_rate` - Target rate in Hz (16000 for speech).
        /// * `block_samples` - Samples per pushed block.
        ///
        /// # Errors
        /// Returns `AudioDeviceNotFound` when the named device (or any
        /// default) is missing.
        pub fn new(
            device_name: Option<&str>,
            ring: Arc<AudioRingBuffer>,
            sample_rate: u32,
            block_samples: usize,
        ) -> Result<Self> {
            let device = with_suppressed_stderr(|| {
                let host = cpal::default_host();

                if let Some(name) = device_name {
                    let devices = host
                        .input_devices()
                        .map_err(|e| DeckhandError::AudioCapture {
                            message: format!("Failed to enumerate devices: {}", e),
                        })?;

                    let mut found_device = None;
                    for dev in devices {
                        if let Ok(dev_name) = dev.name()
                            && dev_name == name
                        {
                            found_device = Some(dev);
                            break;
                        }
                    }

                    found_device.ok_or_else(|| DeckhandError::AudioDeviceNotFound {
                        device: name.to_string(),
                    })
                } else {
                    get_best_default_device()
                }
            })?;

            Ok(Self {
                device,
                stream: Arc::new(Mutex::new(None)),
                ring,
                pending: Arc::new(Mutex::new(Vec::new())),
                callback_count: Arc::new(AtomicU64::new(0)),
                sample_rate,
                block_samples,
            })
        }

        fn ingest(pending: &Mutex<Vec<i16>>, ring: &AudioRingBuffer, block_samples: usize, data: &[i16]) {
            if let Ok(mut pending) = pending.lock() {
                pending.extend_from_slice(data);
                cut_blocks(&mut pending, ring, block_samples);
            }
        }

        /// Build the audio stream with the configured format.
        ///
        /// Tries in order:
        /// 1. i16/16kHz/mono — preferred, zero-copy path
        /// 2. f32/16kHz/mono — for devices that only expose float formats
        /// 3. Device default config — native rate/channels with software
        ///    conversion
        ///
        /// Step 3 handles PipeWire setups where the ALSA compatibility layer
        /// accepts non-native configs but never fires the data callback.
        fn build_stream(&self) -> Result<cpal::Stream> {
            let preferred_config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(self.sample_rate),
                buffer_size: cpal::BufferSize::Fixed(self.block_samples as u32),
            };

            let err_callback = |err| {
                // Overruns/underruns are status warnings, not failures.
                eprintln!("deckhand: audio stream status: {}", err);
            };

            // Try i16/16kHz/mono — PipeWire/PulseAudio convert transparently
            let ring = Arc::clone(&self.ring);
            let pending = Arc::clone(&self.pending);
            let counter = Arc::clone(&self.callback_count);
            let block_samples = self.block_samples;
            if let Ok(stream) = self.device.build_input_stream(
                &preferred_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Self::ingest(&pending, &ring, block_samples, data);
                },
                err_callback,
                None,
            ) {
                return Ok(stream);
            }

            // Try f32/16kHz/mono
            let ring = Arc::clone(&self.ring);
            let pending = Arc::clone(&self.pending);
            let counter = Arc::clone(&self.callback_count);
            let block_samples = self.block_samples;
            if let Ok(stream) = self.device.build_input_stream(
                &preferred_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    Self::ingest(&pending, &ring, block_samples, &converted);
                },
                err_callback,
                None,
            ) {
                return Ok(stream);
            }

            self.build_stream_native()
        }

        /// Build a stream using the device's default/native config, with
        /// software channel mixing (stereo→mono) and resampling.
        fn build_stream_native(&self) -> Result<cpal::Stream> {
            use cpal::SampleFormat;

            let default_config =
                self.device
                    .default_input_config()
                    .map_err(|e| DeckhandError::AudioCapture {
                        message: format!("Failed to query default input config: {}", e),
                    })?;

            let native_rate = default_config.sample_rate().0;
            let native_channels = default_config.channels() as usize;
            let target_rate = self.sample_rate;

            let stream_config: cpal::StreamConfig = default_config.clone().into();

            eprintln!(
                "deckhand: using native audio format ({}ch/{}Hz/{:?}), converting in software",
                native_channels,
                native_rate,
                default_config.sample_format(),
            );

            let err_callback = |err| {
                eprintln!("deckhand: audio stream status: {}", err);
            };

            let ring = Arc::clone(&self.ring);
            let pending = Arc::clone(&self.pending);
            let counter = Arc::clone(&self.callback_count);
            let block_samples = self.block_samples;

            match default_config.sample_format() {
                SampleFormat::I16 => self
                    .device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            counter.fetch_add(1, Ordering::Relaxed);
                            let converted = convert_to_mono_target_rate(
                                data,
                                native_channels,
                                native_rate,
                                target_rate,
                            );
                            Self::ingest(&pending, &ring, block_samples, &converted);
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| DeckhandError::AudioCapture {
                        message: format!("Failed to build native i16 stream: {}", e),
                    }),
                SampleFormat::F32 => self
                    .device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            counter.fetch_add(1, Ordering::Relaxed);
                            let i16_data: Vec<i16> = data
                                .iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                                .collect();
                            let converted = convert_to_mono_target_rate(
                                &i16_data,
                                native_channels,
                                native_rate,
                                target_rate,
                            );
                            Self::ingest(&pending, &ring, block_samples, &converted);
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| DeckhandError::AudioCapture {
                        message: format!("Failed to build native f32 stream: {}", e),
                    }),
                fmt => Err(DeckhandError::AudioFormatMismatch {
                    expected: "i16 or f32".to_string(),
                    actual: format!("{:?}", fmt),
                }),
            }
        }
    }

    impl AudioCapture for CpalAudioCapture {
        fn start(&mut self) -> Result<()> {
            {
                let stream_guard =
                    self.stream
                        .lock()
                        .map_err(|e| DeckhandError::AudioCapture {
                            message: format!("Failed to lock stream: {}", e),
                        })?;
                if stream_guard.is_some() {
                    return Ok(()); // Already started
                }
            }

            let stream = self.build_stream()?;
            stream.play().map_err(|e| DeckhandError::AudioCapture {
                message: format!("Failed to start audio stream: {}", e),
            })?;

            // Wait briefly to check if the CPAL callback actually fires.
            // Some PipeWire-ALSA setups accept non-native configs but never
            // deliver data.
            std::thread::sleep(std::time::Duration::from_millis(200));

            let final_stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
                drop(stream);
                if let Ok(mut pending) = self.pending.lock() {
                    pending.clear();
                }

                let native_stream = self.build_stream_native()?;
                native_stream
                    .play()
                    .map_err(|e| DeckhandError::AudioCapture {
                        message: format!("Failed to start native audio stream: {}", e),
                    })?;
                native_stream
            } else {
                stream
            };

            let mut stream_guard = self.stream.lock().map_err(|e| DeckhandError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;
            *stream_guard = Some(SendableStream(final_stream));
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            let mut stream_guard = self.stream.lock().map_err(|e| DeckhandError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;

            if let Some(sendable_stream) = stream_guard.take() {
                sendable_stream
                    .0
                    .pause()
                    .map_err(|e| DeckhandError::AudioCapture {
                        message: format!("Failed to stop audio stream: {}", e),
                    })?;
            }
            Ok(())
        }
    }

    /// Mix multi-channel audio to mono and resample to the target rate.
    fn convert_to_mono_target_rate(
        samples: &[i16],
        channels: usize,
        source_rate: u32,
        target_rate: u32,
    ) -> Vec<i16> {
        let mono: Vec<i16> = if channels <= 1 {
            samples.to_vec()
        } else {
            samples
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        if source_rate == target_rate {
            mono
        } else {
            resample(&mono, source_rate, target_rate)
        }
    }

    /// Linear-interpolation resampler. Adequate for speech input; the
    /// transcriber is robust to the mild aliasing this introduces.
    fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
        if samples.is_empty() || source_rate == target_rate {
            return samples.to_vec();
        }
        let ratio = source_rate as f64 / target_rate as f64;
        let out_len = (samples.len() as f64 / ratio) as usize;
        let mut out = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = pos - idx as f64;
            let a = samples[idx.min(samples.len() - 1)] as f64;
            let b = samples[(idx + 1).min(samples.len() - 1)] as f64;
            out.push((a + (b - a) * frac).round() as i16);
        }
        out
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeckhandError;

    #[test]
    fn test_cut_blocks_pushes_whole_blocks_only() {
        let ring = AudioRingBuffer::new(8);
        let mut pending = vec![1i16, 2, 3, 4, 5, 6, 7];

        cut_blocks(&mut pending, &ring, 3);

        assert_eq!(ring.len(), 2);
        assert_eq!(pending, vec![7]);
        assert_eq!(ring.drain(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_cut_blocks_leaves_short_remainder_untouched() {
        let ring = AudioRingBuffer::new(8);
        let mut pending = vec![1i16, 2];

        cut_blocks(&mut pending, &ring, 3);

        assert!(ring.is_empty());
        assert_eq!(pending, vec![1, 2]);
    }

    #[test]
    fn test_cut_blocks_zero_block_size_is_a_no_op() {
        let ring = AudioRingBuffer::new(8);
        let mut pending = vec![1i16, 2, 3];

        cut_blocks(&mut pending, &ring, 0);

        assert!(ring.is_empty());
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn test_mock_capture_start_stop_state() {
        let mut capture = MockAudioCapture::new();
        assert!(!capture.is_started());

        capture.start().unwrap();
        assert!(capture.is_started());

        capture.stop().unwrap();
        assert!(!capture.is_started());
    }

    #[test]
    fn test_mock_capture_start_failure() {
        let mut capture = MockAudioCapture::new()
            .with_start_failure()
            .with_error_message("device busy");

        match capture.start() {
            Err(DeckhandError::AudioCapture { message }) => {
                assert_eq!(message, "device busy");
            }
            _ => panic!("Expected AudioCapture error"),
        }
        assert!(!capture.is_started());
    }

    #[test]
    fn test_mock_capture_stop_failure_keeps_started_state() {
        let mut capture = MockAudioCapture::new().with_stop_failure();
        capture.start().unwrap();

        assert!(capture.stop().is_err());
        assert!(capture.is_started());
    }

    #[test]
    fn test_capture_trait_is_object_safe() {
        let mut capture: Box<dyn AudioCapture> = Box::new(MockAudioCapture::new());
        assert!(capture.start().is_ok());
        assert!(capture.stop().is_ok());
    }
}
