//! Live preview surface.
//!
//! The video loop is the only activity allowed to touch the preview; it
//! renders every frame with the current hand observation overlaid and reads
//! the operator's quit key from the same window.

use crate::error::Result;
use crate::gesture::tracker::HandObservation;
use crate::video::camera::VideoFrame;

/// Operator input observed while rendering a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEvent {
    /// Keep running.
    Continue,
    /// Operator pressed the quit key (or closed the window).
    Quit,
}

/// Trait for the preview surface.
pub trait Preview {
    /// Render one frame with an optional hand overlay and report operator
    /// input. Must be called from the video loop only.
    fn render(
        &mut self,
        frame: &VideoFrame,
        overlay: Option<&HandObservation>,
    ) -> Result<PreviewEvent>;
}

/// Headless preview: renders nothing and never quits.
///
/// Used when the preview is disabled in configuration; shutdown then comes
/// from a camera failure or an external signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPreview;

impl Preview for NullPreview {
    fn render(
        &mut self,
        _frame: &VideoFrame,
        _overlay: Option<&HandObservation>,
    ) -> Result<PreviewEvent> {
        Ok(PreviewEvent::Continue)
    }
}

/// Mock preview for testing.
///
/// Counts rendered frames and overlays, and quits after a configured number
/// of frames so loop tests terminate deterministically.
#[derive(Debug, Clone)]
pub struct MockPreview {
    quit_after: Option<usize>,
    rendered: usize,
    overlays: usize,
}

impl MockPreview {
    pub fn new() -> Self {
        Self {
            quit_after: None,
            rendered: 0,
            overlays: 0,
        }
    }

    /// Request a quit once `count` frames have been rendered.
    pub fn with_quit_after(mut self, count: usize) -> Self {
        self.quit_after = Some(count);
        self
    }

    /// Number of frames rendered so far.
    pub fn rendered(&self) -> usize {
        self.rendered
    }

    /// Number of frames rendered with a hand overlay.
    pub fn overlays(&self) -> usize {
        self.overlays
    }
}

impl Default for MockPreview {
    fn default() -> Self {
        Self::new()
    }
}

impl Preview for MockPreview {
    fn render(
        &mut self,
        _frame: &VideoFrame,
        overlay: Option<&HandObservation>,
    ) -> Result<PreviewEvent> {
        self.rendered += 1;
        if overlay.is_some() {
            self.overlays += 1;
        }
        match self.quit_after {
            Some(limit) if self.rendered >= limit => Ok(PreviewEvent::Quit),
            _ => Ok(PreviewEvent::Continue),
        }
    }
}

#[cfg(feature = "preview")]
pub use minifb_preview::MinifbPreview;

#[cfg(feature = "preview")]
mod minifb_preview {
    use super::{Preview, PreviewEvent};
    use crate::error::{DeckhandError, Result};
    use crate::gesture::tracker::HandObservation;
    use crate::video::camera::VideoFrame;
    use minifb::{Key, Window, WindowOptions};

    /// Software-rendered preview window using `minifb`.
    ///
    /// Packs each RGB frame into the window's 0RGB buffer and draws a
    /// vertical marker at the tracked hand's horizontal position. 'q' or
    /// closing the window quits.
    pub struct MinifbPreview {
        window: Window,
        buf: Vec<u32>,
    }

    impl MinifbPreview {
        /// Opens the preview window at the given frame dimensions.
        pub fn new(width: usize, height: usize) -> Result<Self> {
            let mut window = Window::new(
                "deckhand (gesture + voice) - press 'q' to quit",
                width,
                height,
                WindowOptions::default(),
            )
            .map_err(|e| DeckhandError::Preview {
                message: format!("Failed to open preview window: {}", e),
            })?;
            // Frames arrive at camera rate; don't let minifb spin faster.
            window.limit_update_rate(Some(std::time::Duration::from_millis(16)));

            Ok(Self {
                window,
                buf: vec![0u32; width * height],
            })
        }

        fn pack_frame(&mut self, frame: &VideoFrame) {
            let pixels = (frame.width * frame.height) as usize;
            self.buf.resize(pixels, 0);
            for (dst, rgb) in self.buf.iter_mut().zip(frame.rgb.chunks_exact(3)) {
                *dst = ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32;
            }
        }

        fn draw_marker(&mut self, frame: &VideoFrame, observation: &HandObservation) {
            let width = frame.width as usize;
            let height = frame.height as usize;
            if width == 0 || height == 0 {
                return;
            }
            let column = ((observation.x.clamp(0.0, 1.0) * (width as f32 - 1.0)) as usize)
                .min(width - 1);
            for row in 0..height {
                self.buf[row * width + column] = 0x00ff40;
            }
        }
    }

    impl Preview for MinifbPreview {
        fn render(
            &mut self,
            frame: &VideoFrame,
            overlay: Option<&HandObservation>,
        ) -> Result<PreviewEvent> {
            self.pack_frame(frame);
            if let Some(observation) = overlay {
                self.draw_marker(frame, observation);
            }

            self.window
                .update_with_buffer(&self.buf, frame.width as usize, frame.height as usize)
                .map_err(|e| DeckhandError::Preview {
                    message: format!("Failed to update preview window: {}", e),
                })?;

            if !self.window.is_open() || self.window.is_key_down(Key::Q) {
                return Ok(PreviewEvent::Quit);
            }
            Ok(PreviewEvent::Continue)
        }
    }
}
