//! Clock utilities for the monitoring loop.
//!
//! The loop anchors a monotonic epoch at startup and measures everything
//! against it: motion timestamps, capture cooldowns, settle delays. Wall
//! time is only consulted when naming output artifacts, where Unix-second
//! filenames give uniqueness and monotonic ordering across captures.

use std::time::Instant;

/// A monitor clock providing monotonic timestamps relative to a fixed
/// epoch (the moment the monitoring loop started).
#[derive(Debug, Clone)]
pub struct MonitorClock {
    /// The instant monitoring started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MonitorClock {
    /// Create a new monitor clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since monitoring started.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since monitoring started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at monitoring start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Current wall-clock time as whole Unix seconds.
    ///
    /// Capture artifacts are named with this value; two captures can never
    /// share a second because a capture itself lasts longer than that.
    pub fn wall_unix_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = MonitorClock::start();
        // Should be very small but non-negative
        assert!(clock.elapsed_ns() < 1_000_000_000); // less than 1 second
    }

    #[test]
    fn test_epoch_wall_is_rfc3339() {
        let clock = MonitorClock::start();
        assert!(chrono::DateTime::parse_from_rfc3339(clock.epoch_wall()).is_ok());
    }
}
