//! Per-channel cooldown policy.
//!
//! A raw detection becomes an action only if its channel has not fired
//! within the cooldown. One physical swipe spans several video frames and
//! one phrase can yield several qualifying segments; the gate collapses
//! each into a single slide jump.

use crate::clock::{Clock, SystemClock};
use crate::fusion::action::Channel;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Shared timing policy with one independent clock per channel.
///
/// `allow` is an atomic read-then-write: the per-channel last-fire slot is
/// read and updated under one lock, so two racing callers on the same
/// channel can never both be approved inside one cooldown window.
pub struct CooldownGate {
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    last_fire: Mutex<[Option<Instant>; Channel::COUNT]>,
}

impl CooldownGate {
    /// Creates a gate with the given cooldown, driven by the system clock.
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, Arc::new(SystemClock))
    }

    /// Creates a gate with a custom clock (for deterministic testing).
    pub fn with_clock(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown,
            clock,
            last_fire: Mutex::new([None; Channel::COUNT]),
        }
    }

    /// Returns whether the channel may fire now, recording the fire time on
    /// approval.
    ///
    /// Approved when the channel has never fired, or when more than the
    /// cooldown has elapsed since its last approved fire. The side effect
    /// happens before returning, so an immediate repeat on the same channel
    /// is rejected.
    pub fn allow(&self, channel: Channel) -> bool {
        let now = self.clock.now();
        let mut slots = self.lock();
        let slot = &mut slots[channel.index()];

        match slot {
            Some(last) if now.saturating_duration_since(*last) <= self.cooldown => false,
            _ => {
                *slot = Some(now);
                true
            }
        }
    }

    /// The configured cooldown duration.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> MutexGuard<'_, [Option<Instant>; Channel::COUNT]> {
        // The table is plain data; a poisoned lock carries no broken invariant.
        match self.last_fire.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn gate_with_mock(cooldown_ms: u64) -> (CooldownGate, MockClock) {
        let clock = MockClock::new();
        let gate = CooldownGate::with_clock(
            Duration::from_millis(cooldown_ms),
            Arc::new(clock.clone()),
        );
        (gate, clock)
    }

    #[test]
    fn test_first_fire_is_always_allowed() {
        let (gate, _clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Gesture));
    }

    #[test]
    fn test_immediate_repeat_on_same_channel_is_rejected() {
        // Two calls at the identical timestamp: the first call's side effect
        // blocks the second.
        let (gate, _clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Voice));
        assert!(!gate.allow(Channel::Voice));
    }

    #[test]
    fn test_fire_within_cooldown_is_rejected() {
        let (gate, clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Gesture));

        clock.advance(Duration::from_millis(300));
        assert!(!gate.allow(Channel::Gesture));
    }

    #[test]
    fn test_fire_at_exactly_cooldown_is_rejected() {
        // The invariant is strict: now - last_fire must exceed the cooldown.
        let (gate, clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Gesture));

        clock.advance(Duration::from_millis(500));
        assert!(!gate.allow(Channel::Gesture));
    }

    #[test]
    fn test_fire_after_cooldown_is_allowed() {
        let (gate, clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Gesture));

        clock.advance(Duration::from_millis(501));
        assert!(gate.allow(Channel::Gesture));
    }

    #[test]
    fn test_channels_do_not_suppress_each_other() {
        // Gesture and voice within one cooldown window both fire; the
        // channels rate-limit only themselves.
        let (gate, clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Gesture));

        clock.advance(Duration::from_millis(100));
        assert!(gate.allow(Channel::Voice));

        // Both channels are now hot independently.
        assert!(!gate.allow(Channel::Gesture));
        assert!(!gate.allow(Channel::Voice));
    }

    #[test]
    fn test_rejected_attempt_does_not_reset_the_clock() {
        let (gate, clock) = gate_with_mock(500);
        assert!(gate.allow(Channel::Voice));

        // Hammering the gate inside the window must not extend the window.
        clock.advance(Duration::from_millis(400));
        assert!(!gate.allow(Channel::Voice));

        clock.advance(Duration::from_millis(101));
        assert!(gate.allow(Channel::Voice));
    }

    #[test]
    fn test_concurrent_allow_approves_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread;

        let (gate, _clock) = gate_with_mock(500);
        let gate = Arc::new(gate);
        let approved = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let approved = approved.clone();
            handles.push(thread::spawn(move || {
                if gate.allow(Channel::Voice) {
                    approved.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(approved.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cooldown_accessor() {
        let gate = CooldownGate::new(Duration::from_millis(500));
        assert_eq!(gate.cooldown(), Duration::from_millis(500));
    }
}
