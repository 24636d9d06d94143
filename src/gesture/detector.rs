//! Hand-landmark detector contract.
//!
//! The detector is an external collaborator: given one video frame it
//! reports at most one hand (position plus handedness) or nothing. The
//! trait is the integration point for a landmark model; a scripted mock
//! ships for tests.

use crate::config::GestureConfig;
use crate::defaults;
use crate::error::{DeckhandError, Result};
use crate::gesture::tracker::{HandObservation, Handedness};
use crate::video::camera::VideoFrame;
use std::collections::VecDeque;
use std::time::Instant;

/// Detector configuration handed to the backend.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Maximum number of hands tracked per frame. The fusion core requires 1.
    pub max_hands: usize,
    /// Minimum confidence for an initial detection (0.0 to 1.0).
    pub detection_confidence: f32,
    /// Minimum confidence for frame-to-frame tracking (0.0 to 1.0).
    pub tracking_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_hands: defaults::MAX_HANDS,
            detection_confidence: defaults::DETECTION_CONFIDENCE,
            tracking_confidence: defaults::TRACKING_CONFIDENCE,
        }
    }
}

impl DetectorConfig {
    /// Builds the detector configuration from the gesture section of the
    /// user configuration.
    pub fn from_gesture_config(config: &GestureConfig) -> Self {
        Self {
            max_hands: defaults::MAX_HANDS,
            detection_confidence: config.detection_confidence,
            tracking_confidence: config.tracking_confidence,
        }
    }
}

/// Trait for hand-landmark detection backends.
///
/// `Ok(None)` means no hand in this frame: not an error, simply no
/// candidate this tick.
pub trait HandDetector {
    /// Run detection on one frame.
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<HandObservation>>;
}

/// Open the configured hand detector.
///
/// No landmark backend is currently bundled; integrators supply a
/// `HandDetector` implementation wrapping their model runtime. Without one
/// this fails at startup, before any activity starts.
pub fn open_detector(config: &DetectorConfig) -> Result<Box<dyn HandDetector>> {
    Err(DeckhandError::DetectorUnavailable {
        message: format!(
            "no hand-landmark backend compiled in (max hands {}, confidence {}); \
             supply a HandDetector implementation",
            config.max_hands, config.detection_confidence
        ),
    })
}

/// Scripted detector for testing.
///
/// Plays back a queue of per-frame results: a hand at a given position, a
/// miss, or a failure. Once the script is exhausted, every frame is a miss.
#[derive(Debug, Default)]
pub struct MockHandDetector {
    script: VecDeque<ScriptEntry>,
    frames_seen: usize,
}

#[derive(Debug)]
enum ScriptEntry {
    Hand { x: f32, handedness: Handedness },
    Miss,
    Failure(String),
}

impl MockHandDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame that detects a hand at `x` with the given handedness.
    pub fn with_hand(mut self, x: f32, handedness: Handedness) -> Self {
        self.script.push_back(ScriptEntry::Hand { x, handedness });
        self
    }

    /// Queue a frame with no detected hand.
    pub fn with_miss(mut self) -> Self {
        self.script.push_back(ScriptEntry::Miss);
        self
    }

    /// Queue a frame on which detection fails.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.script
            .push_back(ScriptEntry::Failure(message.to_string()));
        self
    }

    /// Number of frames this detector has processed.
    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }
}

impl HandDetector for MockHandDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Option<HandObservation>> {
        self.frames_seen += 1;
        match self.script.pop_front() {
            Some(ScriptEntry::Hand { x, handedness }) => Ok(Some(HandObservation {
                x,
                handedness,
                timestamp: Instant::now(),
            })),
            Some(ScriptEntry::Failure(message)) => Err(DeckhandError::Detection { message }),
            Some(ScriptEntry::Miss) | None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_collaborator_contract() {
        let config = DetectorConfig::default();
        assert_eq!(config.max_hands, 1);
        assert_eq!(config.detection_confidence, 0.7);
        assert_eq!(config.tracking_confidence, 0.7);
    }

    #[test]
    fn test_config_from_gesture_section() {
        let gesture = GestureConfig {
            detection_confidence: 0.9,
            tracking_confidence: 0.8,
            ..Default::default()
        };
        let config = DetectorConfig::from_gesture_config(&gesture);
        assert_eq!(config.detection_confidence, 0.9);
        assert_eq!(config.tracking_confidence, 0.8);
        assert_eq!(config.max_hands, 1);
    }

    #[test]
    fn test_open_detector_without_backend_is_a_startup_error() {
        let result = open_detector(&DetectorConfig::default());
        assert!(matches!(
            result,
            Err(DeckhandError::DetectorUnavailable { .. })
        ));
    }

    #[test]
    fn test_mock_plays_back_script_in_order() {
        let mut detector = MockHandDetector::new()
            .with_hand(0.3, Handedness::Right)
            .with_miss()
            .with_hand(0.5, Handedness::Left);
        let frame = VideoFrame::blank(8, 8);

        let first = detector.detect(&frame).unwrap().expect("hand expected");
        assert_eq!(first.x, 0.3);
        assert_eq!(first.handedness, Handedness::Right);

        assert!(detector.detect(&frame).unwrap().is_none());

        let third = detector.detect(&frame).unwrap().expect("hand expected");
        assert_eq!(third.x, 0.5);
        assert_eq!(third.handedness, Handedness::Left);
    }

    #[test]
    fn test_mock_misses_after_script_exhausted() {
        let mut detector = MockHandDetector::new().with_hand(0.4, Handedness::Right);
        let frame = VideoFrame::blank(8, 8);

        assert!(detector.detect(&frame).unwrap().is_some());
        assert!(detector.detect(&frame).unwrap().is_none());
        assert!(detector.detect(&frame).unwrap().is_none());
        assert_eq!(detector.frames_seen(), 3);
    }

    #[test]
    fn test_mock_scripted_failure() {
        let mut detector = MockHandDetector::new().with_failure("model crashed");
        let frame = VideoFrame::blank(8, 8);

        let result = detector.detect(&frame);
        assert!(matches!(result, Err(DeckhandError::Detection { .. })));
    }
}
