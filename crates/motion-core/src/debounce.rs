//! Capture-cooldown bookkeeping.
//!
//! Closing and reopening the camera around a recording restarts auto
//! exposure, and the brightness drift while the sensor settles reads as
//! motion. The gate suppresses any capture until the cooldown has elapsed
//! since the last session restart or completed recording. All decisions
//! take an explicit `now_ns`, so tests run without real time.

use std::time::Duration;

/// Decides whether a detected motion event may start a recording.
#[derive(Debug)]
pub struct CaptureGate {
    cooldown_ns: u64,
    last_capture_ns: Option<u64>,
    last_motion_ns: Option<u64>,
    force: bool,
}

impl CaptureGate {
    /// Create a gate with the given cooldown ("ghosting interval").
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ns: cooldown.as_nanos() as u64,
            last_capture_ns: None,
            last_motion_ns: None,
            force: false,
        }
    }

    /// Stamp the start of a cooldown window.
    ///
    /// Called when a camera session opens and again after each completed
    /// handoff, so exposure drift during the settle window cannot
    /// retrigger a capture.
    pub fn rearm(&mut self, now_ns: u64) {
        self.last_capture_ns = Some(now_ns);
    }

    /// Note a motion observation (kept for status reporting).
    pub fn note_motion(&mut self, now_ns: u64) {
        self.last_motion_ns = Some(now_ns);
    }

    /// Timestamp of the most recent motion observation.
    pub fn last_motion_ns(&self) -> Option<u64> {
        self.last_motion_ns
    }

    /// Request a capture on the next decision, bypassing both the motion
    /// requirement and the cooldown. One-shot.
    pub fn force(&mut self) {
        self.force = true;
    }

    /// Decide whether a capture may start now.
    ///
    /// True iff motion was detected and the cooldown has elapsed, or the
    /// force flag was set. The force flag is consumed by this call.
    pub fn should_capture(&mut self, now_ns: u64, motion: bool) -> bool {
        let forced = std::mem::take(&mut self.force);
        let cooled = match self.last_capture_ns {
            None => true,
            Some(last) => now_ns > last + self.cooldown_ns,
        };
        (motion && cooled) || forced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECOND: u64 = 1_000_000_000;

    fn gate() -> CaptureGate {
        CaptureGate::new(Duration::from_secs(2))
    }

    #[test]
    fn motion_before_first_rearm_captures() {
        let mut gate = gate();
        assert!(gate.should_capture(0, true));
    }

    #[test]
    fn cooldown_suppresses_motion_until_elapsed() {
        let mut gate = gate();
        gate.rearm(0);
        assert!(!gate.should_capture(SECOND, true));
        assert!(!gate.should_capture(2 * SECOND, true)); // boundary: strictly greater
        assert!(gate.should_capture(2 * SECOND + 1, true));
    }

    #[test]
    fn no_motion_never_captures() {
        let mut gate = gate();
        gate.rearm(0);
        assert!(!gate.should_capture(10 * SECOND, false));
    }

    #[test]
    fn force_bypasses_motion_and_cooldown() {
        let mut gate = gate();
        gate.rearm(0);
        gate.force();
        assert!(gate.should_capture(SECOND, false));
    }

    #[test]
    fn force_is_one_shot() {
        let mut gate = gate();
        gate.force();
        assert!(gate.should_capture(0, false));
        assert!(!gate.should_capture(1, false));
    }

    #[test]
    fn rearm_restarts_the_cooldown() {
        let mut gate = gate();
        gate.rearm(0);
        assert!(gate.should_capture(3 * SECOND, true));
        gate.rearm(3 * SECOND);
        assert!(!gate.should_capture(4 * SECOND, true));
        assert!(gate.should_capture(6 * SECOND, true));
    }

    #[test]
    fn last_motion_is_tracked() {
        let mut gate = gate();
        assert_eq!(gate.last_motion_ns(), None);
        gate.note_motion(5 * SECOND);
        assert_eq!(gate.last_motion_ns(), Some(5 * SECOND));
    }

    proptest! {
        #[test]
        fn capture_only_after_cooldown(armed_at in 0u64..u64::MAX / 4, offset in 0u64..10 * SECOND) {
            let mut gate = CaptureGate::new(Duration::from_secs(2));
            gate.rearm(armed_at);
            let now = armed_at + offset;
            let expected = offset > 2 * SECOND;
            prop_assert_eq!(gate.should_capture(now, true), expected);
        }
    }
}
