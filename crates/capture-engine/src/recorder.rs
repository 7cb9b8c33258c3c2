//! External recorder invocation.
//!
//! Recording is handed off to an out-of-process tool (ffmpeg with stream
//! copy) so the monitoring process never touches encoded media. The
//! invoker owns the handoff policy: wait for the device, bound each run
//! with a hard timeout, kill and retry on timeout, and report a clean
//! non-zero exit without retrying it.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use camwatch_common::error::{CamwatchError, CamwatchResult};
use tokio::process::Command;

use crate::gate::DeviceGate;

/// Everything needed for one recorder handoff. Created per capture,
/// never persisted.
#[derive(Debug, Clone)]
pub struct RecorderTask {
    /// Camera device node to record from.
    pub device: PathBuf,

    /// Clip duration.
    pub duration: Duration,

    /// Hard timeout for the whole process run (duration + margin).
    pub timeout: Duration,

    /// Output artifact path.
    pub output: PathBuf,
}

/// Result of one bounded recorder attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderRun {
    /// The process exited on its own.
    Completed { exit_code: Option<i32> },

    /// The process exceeded the hard timeout and was killed.
    TimedOut,
}

/// Trait for running a single bounded recorder attempt.
#[async_trait]
pub trait RecorderBackend: Send {
    /// Run the recorder once. On timeout the implementation must have
    /// killed the process before reporting [`RecorderRun::TimedOut`].
    async fn run(&mut self, task: &RecorderTask) -> CamwatchResult<RecorderRun>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Settings for building recorder tasks.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Camera device node.
    pub device: PathBuf,

    /// Directory capture artifacts are written to.
    pub output_dir: PathBuf,

    /// Container extension for artifacts.
    pub container: String,

    /// Clip duration.
    pub capture_duration: Duration,

    /// Margin added to the clip duration for the hard timeout. Generous:
    /// it absorbs process startup and container finalization.
    pub timeout_margin: Duration,

    /// Dry-run: skip the gate and the backend entirely.
    pub skip_recording: bool,
}

/// Report of a completed capture.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    /// Total backend attempts, including timed-out ones.
    pub attempts: u32,

    /// Exit code of the final attempt (None when killed by a signal).
    pub exit_code: Option<i32>,

    /// Artifact path.
    pub output: PathBuf,
}

/// Outcome of a capture handoff.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Recorded(CaptureReport),
    /// Recording is disabled; nothing ran.
    Skipped,
}

/// Owns the capture handoff: device gate, retry policy, artifact naming.
pub struct RecorderInvoker {
    config: RecorderConfig,
    gate: DeviceGate,
    backend: Box<dyn RecorderBackend>,
}

impl RecorderInvoker {
    pub fn new(config: RecorderConfig, gate: DeviceGate, backend: Box<dyn RecorderBackend>) -> Self {
        Self {
            config,
            gate,
            backend,
        }
    }

    /// Run one capture handoff.
    ///
    /// The artifact is named from `started_unix` so filenames are unique
    /// and ordered. A timed-out run is killed and retried immediately and
    /// indefinitely; a clean non-zero exit is logged but not retried.
    pub async fn capture(&mut self, started_unix: i64) -> CamwatchResult<CaptureOutcome> {
        if self.config.skip_recording {
            tracing::info!("Recording disabled, skipping capture");
            return Ok(CaptureOutcome::Skipped);
        }

        let busy_polls = self.gate.wait_until_free().await;
        if busy_polls > 0 {
            tracing::info!(busy_polls, "Device released");
        }

        let task = RecorderTask {
            device: self.config.device.clone(),
            duration: self.config.capture_duration,
            timeout: self.config.capture_duration + self.config.timeout_margin,
            output: self
                .config
                .output_dir
                .join(format!("{started_unix}.{}", self.config.container)),
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            tracing::info!(
                output = %task.output.display(),
                attempt = attempts,
                backend = %self.backend.name(),
                "Recording"
            );
            match self.backend.run(&task).await? {
                RecorderRun::Completed { exit_code } => {
                    if exit_code == Some(0) {
                        tracing::info!(attempts, "Recorder finished");
                    } else {
                        tracing::warn!(?exit_code, "Recorder exited with non-zero status");
                    }
                    return Ok(CaptureOutcome::Recorded(CaptureReport {
                        attempts,
                        exit_code,
                        output: task.output.clone(),
                    }));
                }
                RecorderRun::TimedOut => {
                    tracing::warn!(attempt = attempts, "Recorder hung past its timeout, retrying");
                }
            }
        }
    }
}

/// Recorder backend shelling out to ffmpeg with stream copy.
pub struct FfmpegRecorder {
    video_size: String,
    input_format: String,
}

impl FfmpegRecorder {
    pub fn new(video_size: impl Into<String>, input_format: impl Into<String>) -> Self {
        Self {
            video_size: video_size.into(),
            input_format: input_format.into(),
        }
    }
}

#[async_trait]
impl RecorderBackend for FfmpegRecorder {
    async fn run(&mut self, task: &RecorderTask) -> CamwatchResult<RecorderRun> {
        let mut child = Command::new("ffmpeg")
            .args(["-f", "v4l2", "-video_size"])
            .arg(&self.video_size)
            .arg("-input_format")
            .arg(&self.input_format)
            .arg("-i")
            .arg(&task.device)
            .arg("-t")
            .arg(format_ffmpeg_duration(task.duration))
            .args(["-c:v", "copy"])
            .arg(&task.output)
            .args(["-y", "-hide_banner"])
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| CamwatchError::recorder(format!("Failed to spawn ffmpeg: {e}")))?;

        match tokio::time::timeout(task.timeout, child.wait()).await {
            Ok(status) => {
                let status = status
                    .map_err(|e| CamwatchError::recorder(format!("Failed to wait for ffmpeg: {e}")))?;
                Ok(RecorderRun::Completed {
                    exit_code: status.code(),
                })
            }
            Err(_) => {
                child.start_kill().ok();
                let _ = child.wait().await;
                Ok(RecorderRun::TimedOut)
            }
        }
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Whether `ffmpeg` is on PATH.
pub fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// hh:mm:ss form accepted by ffmpeg's `-t`.
fn format_ffmpeg_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::DeviceProbe;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ScriptedBackend {
        runs: VecDeque<RecorderRun>,
        invocations: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RecorderBackend for ScriptedBackend {
        async fn run(&mut self, _task: &RecorderTask) -> CamwatchResult<RecorderRun> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .runs
                .pop_front()
                .unwrap_or(RecorderRun::Completed { exit_code: Some(0) }))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct CountingProbe {
        busy_polls: u32,
        calls: Arc<AtomicU32>,
    }

    impl DeviceProbe for CountingProbe {
        fn is_busy(&mut self) -> bool {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            calls <= self.busy_polls
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn make_invoker(
        skip_recording: bool,
        busy_polls: u32,
        runs: Vec<RecorderRun>,
    ) -> (RecorderInvoker, Arc<AtomicU32>, Arc<AtomicU32>) {
        let backend_calls = Arc::new(AtomicU32::new(0));
        let probe_calls = Arc::new(AtomicU32::new(0));
        let backend = ScriptedBackend {
            runs: runs.into(),
            invocations: backend_calls.clone(),
        };
        let probe = CountingProbe {
            busy_polls,
            calls: probe_calls.clone(),
        };
        let gate = DeviceGate::new(Box::new(probe), Duration::from_millis(500));
        let config = RecorderConfig {
            device: PathBuf::from("/dev/video0"),
            output_dir: PathBuf::from("/tmp"),
            container: "mkv".to_string(),
            capture_duration: Duration::from_secs(5),
            timeout_margin: Duration::from_secs(10),
            skip_recording,
        };
        (
            RecorderInvoker::new(config, gate, Box::new(backend)),
            backend_calls,
            probe_calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_retry_until_success() {
        let runs = vec![
            RecorderRun::TimedOut,
            RecorderRun::TimedOut,
            RecorderRun::TimedOut,
            RecorderRun::Completed { exit_code: Some(0) },
        ];
        let (mut invoker, backend_calls, _) = make_invoker(false, 0, runs);

        let outcome = invoker.capture(1_700_000_000).await.unwrap();
        let CaptureOutcome::Recorded(report) = outcome else {
            panic!("expected a recorded outcome");
        };
        assert_eq!(report.attempts, 4);
        assert_eq!(backend_calls.load(Ordering::SeqCst), 4);
        assert_eq!(report.output, PathBuf::from("/tmp/1700000000.mkv"));
    }

    #[tokio::test(start_paused = true)]
    async fn non_zero_exit_is_not_retried() {
        let runs = vec![RecorderRun::Completed { exit_code: Some(1) }];
        let (mut invoker, backend_calls, _) = make_invoker(false, 0, runs);

        let outcome = invoker.capture(1_700_000_000).await.unwrap();
        let CaptureOutcome::Recorded(report) = outcome else {
            panic!("expected a recorded outcome");
        };
        assert_eq!(report.attempts, 1);
        assert_eq!(report.exit_code, Some(1));
        assert_eq!(backend_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_runs_before_the_first_attempt() {
        let (mut invoker, backend_calls, probe_calls) = make_invoker(false, 2, vec![]);

        invoker.capture(1_700_000_000).await.unwrap();
        // busy twice, free on the third poll
        assert_eq!(probe_calls.load(Ordering::SeqCst), 3);
        assert_eq!(backend_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_recording_touches_neither_gate_nor_backend() {
        let (mut invoker, backend_calls, probe_calls) = make_invoker(true, 0, vec![]);

        let outcome = invoker.capture(1_700_000_000).await.unwrap();
        assert!(matches!(outcome, CaptureOutcome::Skipped));
        assert_eq!(probe_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ffmpeg_duration_is_hh_mm_ss() {
        assert_eq!(format_ffmpeg_duration(Duration::from_secs(5)), "00:00:05");
        assert_eq!(format_ffmpeg_duration(Duration::from_secs(3661)), "01:01:01");
    }
}
