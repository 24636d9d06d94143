//! Camera frame acquisition.
//!
//! The camera is an external collaborator: the core only needs a blocking
//! per-frame read. `FrameSource` is that contract; integrations wrap their
//! platform capture API in it. A scripted mock ships for tests.

use crate::config::VideoConfig;
use crate::error::{DeckhandError, Result};
use std::time::Instant;

/// One captured video frame: an opaque RGB pixel buffer.
///
/// The core never interprets pixels; frames pass through to the hand
/// detector and the preview surface.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB, 3 bytes per pixel, row-major.
    pub rgb: Vec<u8>,
    pub timestamp: Instant,
}

impl VideoFrame {
    /// Creates a black frame of the given dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgb: vec![0u8; (width * height * 3) as usize],
            timestamp: Instant::now(),
        }
    }
}

/// Trait for camera devices.
///
/// `read` blocks until the next frame is available. A read error is fatal
/// for the whole process: the video loop is the liveness heartbeat.
pub trait FrameSource {
    /// Read the next frame, blocking until one is available.
    fn read(&mut self) -> Result<VideoFrame>;
}

/// Open the configured camera.
///
/// No camera backend is currently bundled: the retrieval of camera pixels
/// is platform glue outside this crate, supplied by integrators as a
/// `FrameSource` implementation. Calling this without one fails with the
/// startup device error, before any activity starts.
pub fn open_camera(config: &VideoConfig) -> Result<Box<dyn FrameSource>> {
    Err(DeckhandError::CameraUnavailable {
        message: format!(
            "no camera backend compiled in (camera index {}); \
             supply a FrameSource implementation",
            config.camera_index
        ),
    })
}

/// Mock frame source for testing.
///
/// Produces blank frames; optionally fails after a configured number of
/// successful reads to exercise the fatal-read path.
#[derive(Debug, Clone)]
pub struct MockFrameSource {
    width: u32,
    height: u32,
    remaining: Option<usize>,
    interval: Option<std::time::Duration>,
    reads: usize,
}

impl MockFrameSource {
    /// Create a mock producing an unbounded stream of blank frames.
    pub fn new() -> Self {
        Self {
            width: 64,
            height: 48,
            remaining: None,
            interval: None,
            reads: 0,
        }
    }

    /// Configure the mock to fail with a read error after `count` frames.
    pub fn with_frame_limit(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }

    /// Block for `interval` per read, simulating camera frame cadence.
    pub fn with_frame_interval(mut self, interval: std::time::Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Number of frames read so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for MockFrameSource {
    fn read(&mut self) -> Result<VideoFrame> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return Err(DeckhandError::FrameRead {
                    message: "mock frame source exhausted".to_string(),
                });
            }
            *remaining -= 1;
        }
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }
        self.reads += 1;
        Ok(VideoFrame::blank(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_dimensions() {
        let frame = VideoFrame::blank(320, 240);
        assert_eq!(frame.width, 320);
        assert_eq!(frame.height, 240);
        assert_eq!(frame.rgb.len(), 320 * 240 * 3);
        assert!(frame.rgb.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_open_camera_without_backend_is_a_startup_error() {
        let config = VideoConfig::default();
        let result = open_camera(&config);
        assert!(matches!(
            result,
            Err(DeckhandError::CameraUnavailable { .. })
        ));
    }

    #[test]
    fn test_mock_produces_frames_until_limit() {
        let mut source = MockFrameSource::new().with_frame_limit(2);

        assert!(source.read().is_ok());
        assert!(source.read().is_ok());
        let result = source.read();
        assert!(matches!(result, Err(DeckhandError::FrameRead { .. })));
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn test_unlimited_mock_keeps_producing() {
        let mut source = MockFrameSource::new();
        for _ in 0..100 {
            assert!(source.read().is_ok());
        }
        assert_eq!(source.reads(), 100);
    }
}
