//! Gesture-to-action state machine.
//!
//! One observation per processed frame goes in; at most one cooldown-gated
//! action comes out. A right hand sweeping right advances the deck, a left
//! hand sweeping left goes back.

use crate::defaults;
use crate::fusion::action::{Action, Channel};
use crate::fusion::cooldown::CooldownGate;
use std::sync::Arc;
use std::time::Instant;

/// Which hand the detector classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// One per-frame hand measurement from the detector.
///
/// `x` is the wrist's horizontal position in normalized frame coordinates,
/// 0.0 at the left edge and 1.0 at the right. Produced only when exactly one
/// hand is detected; frames without a hand produce nothing and the tracker
/// is not called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandObservation {
    pub x: f32,
    pub handedness: Handedness,
    pub timestamp: Instant,
}

/// Tracks horizontal hand motion across frames and emits swipe actions.
///
/// Keeps exactly one piece of history: the previous observation's `x`.
/// The position is deliberately not cleared when detection drops out for a
/// few frames; reusing the stale position preserves delta continuity
/// across brief dropouts instead of restarting the swipe.
pub struct GestureTracker {
    prev_x: Option<f32>,
    swipe_threshold: f32,
    gate: Arc<CooldownGate>,
}

impl GestureTracker {
    /// Creates a tracker with the default swipe threshold, sharing the
    /// given cooldown gate's GESTURE channel.
    pub fn new(gate: Arc<CooldownGate>) -> Self {
        Self {
            prev_x: None,
            swipe_threshold: defaults::SWIPE_THRESHOLD,
            gate,
        }
    }

    /// Overrides the swipe threshold (fraction of normalized frame width).
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.swipe_threshold = threshold;
        self
    }

    /// Consumes one observation; returns a gate-approved action if the
    /// motion since the previous observation qualifies as a swipe.
    ///
    /// The first observation only seeds the position history, as there is no
    /// delta yet. The history is updated on every call, qualifying or not:
    /// tracking is continuous, never reset by a no-op frame.
    pub fn observe(&mut self, observation: &HandObservation) -> Option<Action> {
        let Some(prev_x) = self.prev_x.replace(observation.x) else {
            return None;
        };
        let dx = observation.x - prev_x;

        let candidate = match observation.handedness {
            Handedness::Right if dx > self.swipe_threshold => Action::Next,
            Handedness::Left if dx < -self.swipe_threshold => Action::Previous,
            _ => return None,
        };

        // The gate's side effect must only happen for real candidates.
        if self.gate.allow(Channel::Gesture) {
            Some(candidate)
        } else {
            None
        }
    }

    /// The horizontal position of the last observation, if any.
    pub fn prev_x(&self) -> Option<f32> {
        self.prev_x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::time::Duration;

    fn tracker_with_clock(cooldown_ms: u64) -> (GestureTracker, MockClock) {
        let clock = MockClock::new();
        let gate = Arc::new(CooldownGate::with_clock(
            Duration::from_millis(cooldown_ms),
            Arc::new(clock.clone()),
        ));
        (GestureTracker::new(gate), clock)
    }

    fn obs(x: f32, handedness: Handedness) -> HandObservation {
        HandObservation {
            x,
            handedness,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_first_observation_seeds_history_without_action() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        assert_eq!(tracker.observe(&obs(0.9, Handedness::Right)), None);
        assert_eq!(tracker.prev_x(), Some(0.9));
    }

    #[test]
    fn test_right_hand_rightward_swipe_emits_next() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.3, Handedness::Right));
        assert_eq!(
            tracker.observe(&obs(0.5, Handedness::Right)),
            Some(Action::Next)
        );
    }

    #[test]
    fn test_left_hand_leftward_swipe_emits_previous() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.6, Handedness::Left));
        assert_eq!(
            tracker.observe(&obs(0.4, Handedness::Left)),
            Some(Action::Previous)
        );
    }

    #[test]
    fn test_right_hand_leftward_motion_is_ignored() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.6, Handedness::Right));
        assert_eq!(tracker.observe(&obs(0.3, Handedness::Right)), None);
    }

    #[test]
    fn test_left_hand_rightward_motion_is_ignored() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.3, Handedness::Left));
        assert_eq!(tracker.observe(&obs(0.6, Handedness::Left)), None);
    }

    #[test]
    fn test_subthreshold_motion_is_ignored() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.30, Handedness::Right));
        assert_eq!(tracker.observe(&obs(0.39, Handedness::Right)), None);
    }

    #[test]
    fn test_motion_at_exactly_threshold_is_ignored() {
        // The comparison is strict: dx must exceed the threshold.
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.3, Handedness::Right));
        assert_eq!(tracker.observe(&obs(0.4, Handedness::Right)), None);
    }

    #[test]
    fn test_history_updates_even_without_a_candidate() {
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.3, Handedness::Right));
        tracker.observe(&obs(0.35, Handedness::Right));
        assert_eq!(tracker.prev_x(), Some(0.35));

        // Delta is measured against the updated position, not the original.
        assert_eq!(tracker.observe(&obs(0.40, Handedness::Right)), None);
    }

    #[test]
    fn test_every_spaced_step_fires_after_the_first() {
        // Strictly increasing positions, each step above the threshold and
        // spaced beyond the cooldown: every step after the seed fires.
        let (mut tracker, clock) = tracker_with_clock(500);

        assert_eq!(tracker.observe(&obs(0.1, Handedness::Right)), None);
        for (i, x) in [0.25, 0.40, 0.55, 0.70].into_iter().enumerate() {
            clock.advance(Duration::from_millis(501));
            assert_eq!(
                tracker.observe(&obs(x, Handedness::Right)),
                Some(Action::Next),
                "step {} should fire",
                i
            );
        }
    }

    #[test]
    fn test_second_swipe_within_cooldown_is_suppressed() {
        let (mut tracker, clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.1, Handedness::Right));
        assert_eq!(
            tracker.observe(&obs(0.3, Handedness::Right)),
            Some(Action::Next)
        );

        clock.advance(Duration::from_millis(200));
        assert_eq!(tracker.observe(&obs(0.5, Handedness::Right)), None);
    }

    #[test]
    fn test_suppressed_swipe_still_updates_history() {
        let (mut tracker, clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.1, Handedness::Right));
        tracker.observe(&obs(0.3, Handedness::Right));

        clock.advance(Duration::from_millis(200));
        assert_eq!(tracker.observe(&obs(0.5, Handedness::Right)), None);
        assert_eq!(tracker.prev_x(), Some(0.5));
    }

    #[test]
    fn test_no_candidate_does_not_touch_the_gate() {
        // Sub-threshold motion must not consume the cooldown budget.
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.30, Handedness::Right));
        assert_eq!(tracker.observe(&obs(0.35, Handedness::Right)), None);

        // A qualifying swipe right afterwards still fires.
        assert_eq!(
            tracker.observe(&obs(0.50, Handedness::Right)),
            Some(Action::Next)
        );
    }

    #[test]
    fn test_stale_position_survives_detection_dropout() {
        // Frames with no detected hand never reach observe(); the retained
        // position is measured against on the next detected frame.
        let (mut tracker, _clock) = tracker_with_clock(500);

        tracker.observe(&obs(0.2, Handedness::Right));
        // ...several frames with no hand detected...
        assert_eq!(
            tracker.observe(&obs(0.45, Handedness::Right)),
            Some(Action::Next)
        );
    }

    #[test]
    fn test_custom_threshold() {
        let clock = MockClock::new();
        let gate = Arc::new(CooldownGate::with_clock(
            Duration::from_millis(500),
            Arc::new(clock),
        ));
        let mut tracker = GestureTracker::new(gate).with_threshold(0.3);

        tracker.observe(&obs(0.1, Handedness::Right));
        assert_eq!(tracker.observe(&obs(0.3, Handedness::Right)), None);
        assert_eq!(
            tracker.observe(&obs(0.65, Handedness::Right)),
            Some(Action::Next)
        );
    }

    #[test]
    fn test_spec_example_sequence() {
        // Positions [0.3, 0.3, 0.5]: the seed frame, a zero delta, then a
        // 0.2 swipe: exactly one dispatchable action.
        let (mut tracker, _clock) = tracker_with_clock(500);

        let mut actions = Vec::new();
        for x in [0.3, 0.3, 0.5] {
            if let Some(action) = tracker.observe(&obs(x, Handedness::Right)) {
                actions.push(action);
            }
        }
        assert_eq!(actions, vec![Action::Next]);
    }
}
