//! Device-availability polling.
//!
//! The kernel will let two processes race on a V4L2 node in unhelpful
//! ways, so before the recorder opens the camera we poll a liveness probe
//! until no other process holds the device. The gate is advisory, not a
//! lock: a probe that reports free does not guarantee the subsequent open
//! succeeds, and callers must tolerate that.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

/// Trait for a device liveness probe.
pub trait DeviceProbe: Send {
    /// Whether any process currently holds the device open.
    fn is_busy(&mut self) -> bool;

    /// Probe name for logging.
    fn name(&self) -> &str;
}

/// Probe backed by `lsof <device>`.
pub struct LsofProbe {
    device: PathBuf,
}

impl LsofProbe {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl DeviceProbe for LsofProbe {
    fn is_busy(&mut self) -> bool {
        // lsof exits 0 when at least one process has the file open.
        let status = std::process::Command::new("lsof")
            .arg(&self.device)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(error = %e, "lsof unavailable, treating device as free");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "lsof"
    }
}

/// Whether `lsof` is on PATH.
pub fn lsof_available() -> bool {
    std::process::Command::new("lsof")
        .arg("-v")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Polls a [`DeviceProbe`] until the device is free.
pub struct DeviceGate {
    probe: Box<dyn DeviceProbe>,
    poll_interval: Duration,
    max_polls: Option<u32>,
}

impl DeviceGate {
    /// Create an unbounded gate polling at `poll_interval`.
    pub fn new(probe: Box<dyn DeviceProbe>, poll_interval: Duration) -> Self {
        Self {
            probe,
            poll_interval,
            max_polls: None,
        }
    }

    /// Bound the wait to `max_polls` busy polls. When the bound is hit the
    /// gate gives up and returns anyway (it is advisory only).
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Block until the probe reports the device free.
    ///
    /// Unbounded by default: if the device is perpetually held this waits
    /// forever. Returns the number of busy polls observed.
    pub async fn wait_until_free(&mut self) -> u32 {
        let mut polls = 0u32;
        while self.probe.is_busy() {
            polls += 1;
            if let Some(max) = self.max_polls {
                if polls >= max {
                    tracing::warn!(polls, "Device still busy after poll limit, proceeding anyway");
                    break;
                }
            }
            tracing::debug!(polls, probe = %self.probe.name(), "Device busy, waiting");
            tokio::time::sleep(self.poll_interval).await;
        }
        polls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedProbe {
        busy_polls: u32,
        calls: u32,
    }

    impl DeviceProbe for ScriptedProbe {
        fn is_busy(&mut self) -> bool {
            self.calls += 1;
            self.calls <= self.busy_polls
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn free_device_returns_immediately() {
        let probe = ScriptedProbe {
            busy_polls: 0,
            calls: 0,
        };
        let mut gate = DeviceGate::new(Box::new(probe), Duration::from_millis(500));
        assert_eq!(gate.wait_until_free().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_out_every_busy_poll() {
        let probe = ScriptedProbe {
            busy_polls: 4,
            calls: 0,
        };
        let mut gate = DeviceGate::new(Box::new(probe), Duration::from_millis(500));
        assert_eq!(gate.wait_until_free().await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_limit_gives_up_on_a_held_device() {
        struct AlwaysBusy;
        impl DeviceProbe for AlwaysBusy {
            fn is_busy(&mut self) -> bool {
                true
            }
            fn name(&self) -> &str {
                "always-busy"
            }
        }

        let mut gate =
            DeviceGate::new(Box::new(AlwaysBusy), Duration::from_millis(500)).with_max_polls(3);
        assert_eq!(gate.wait_until_free().await, 3);
    }
}
