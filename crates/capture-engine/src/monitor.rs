//! The monitoring loop.
//!
//! A two-macro-state machine. MONITORING pulls frames in arrival order,
//! compares each against the reference frame, and consults the capture
//! gate. CAPTURING delegates the camera to the recorder invoker and
//! blocks the loop until a session is reacquired; no frame is processed
//! in between. Everything runs on one logical task: gate polls, recorder
//! runs, and settle delays all suspend the loop itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camwatch_common::clock::MonitorClock;
use camwatch_common::error::CamwatchResult;
use camwatch_motion_core::{CaptureGate, MotionDetector};
use image::GrayImage;

use crate::recorder::{CaptureOutcome, RecorderInvoker};
use crate::session::SessionManager;

/// Operator commands sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Start a capture immediately, bypassing motion detection and the
    /// cooldown.
    ForceCapture,

    /// Tear down and exit.
    Quit,
}

/// Trait for operator input. Polled once per loop iteration; must not
/// block.
pub trait ControlInput: Send {
    fn poll(&mut self) -> Option<ControlCommand>;
}

/// Headless operation: no operator input.
pub struct NoControl;

impl ControlInput for NoControl {
    fn poll(&mut self) -> Option<ControlCommand> {
        None
    }
}

/// Operator input from stdin lines: `f` forces a capture, `q` quits.
pub struct StdinControl {
    rx: std::sync::mpsc::Receiver<ControlCommand>,
}

impl StdinControl {
    /// Spawn the reader thread. The thread exits when stdin closes.
    pub fn spawn() -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let command = match line.trim() {
                    "f" => Some(ControlCommand::ForceCapture),
                    "q" => Some(ControlCommand::Quit),
                    _ => None,
                };
                if let Some(command) = command {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
            }
        });
        Self { rx }
    }
}

impl ControlInput for StdinControl {
    fn poll(&mut self) -> Option<ControlCommand> {
        self.rx.try_recv().ok()
    }
}

/// Macro-states of the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Monitoring,
    Capturing,
}

/// Why the loop ended. Both are clean terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Operator quit signal.
    Quit,

    /// The frame source ran out of frames.
    EndOfStream,
}

/// The top-level surveillance loop.
pub struct MotionMonitor {
    sessions: SessionManager,
    recorder: RecorderInvoker,
    detector: MotionDetector,
    gate: CaptureGate,
    control: Box<dyn ControlInput>,
    clock: MonitorClock,
    reference: Option<GrayImage>,
    state: MonitorState,
    stop_flag: Arc<AtomicBool>,
    captures: u32,
}

impl MotionMonitor {
    pub fn new(
        sessions: SessionManager,
        recorder: RecorderInvoker,
        detector: MotionDetector,
        gate: CaptureGate,
        control: Box<dyn ControlInput>,
    ) -> Self {
        Self {
            sessions,
            recorder,
            detector,
            gate,
            control,
            clock: MonitorClock::start(),
            reference: None,
            state: MonitorState::Monitoring,
            stop_flag: Arc::new(AtomicBool::new(false)),
            captures: 0,
        }
    }

    /// Stop flag for external coordination (Ctrl-C handlers).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Current macro-state.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Completed recordings so far.
    pub fn captures(&self) -> u32 {
        self.captures
    }

    /// Run the loop until operator quit or end of stream.
    pub async fn run(&mut self) -> CamwatchResult<StopReason> {
        self.sessions.open().await?;
        self.gate.rearm(self.clock.elapsed_ns());
        tracing::info!(epoch = %self.clock.epoch_wall(), "Monitoring started");

        let reason = loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                break StopReason::Quit;
            }
            match self.control.poll() {
                Some(ControlCommand::Quit) => break StopReason::Quit,
                Some(ControlCommand::ForceCapture) => self.gate.force(),
                None => {}
            }

            let frame = match self.sessions.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Frame source ended");
                    break StopReason::EndOfStream;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Frame read failed, stopping");
                    break StopReason::EndOfStream;
                }
            };
            let frame = self.detector.preprocess(&frame);

            let Some(reference) = self.reference.as_ref() else {
                self.reference = Some(frame);
                continue;
            };
            if reference.dimensions() != frame.dimensions() {
                self.reference = Some(frame);
                continue;
            }

            let now_ns = self.clock.elapsed_ns();
            let motion = match self.detector.detect(reference, &frame) {
                Some(region) => {
                    // Invalidate even when the cooldown suppresses the
                    // recording: the reference was captured mid-movement.
                    self.reference = None;
                    self.gate.note_motion(now_ns);
                    tracing::info!(
                        area = region.area,
                        x = region.x,
                        y = region.y,
                        at_secs = self.clock.elapsed_secs(),
                        "Motion detected"
                    );
                    true
                }
                None => false,
            };

            if self.gate.should_capture(now_ns, motion) {
                self.capture().await?;
            }
        };

        self.sessions.close()?;
        tracing::info!(?reason, captures = self.captures, "Monitoring stopped");
        Ok(reason)
    }

    /// The CAPTURING state: hand the device to the recorder, then return
    /// to monitoring once a session is reacquired.
    async fn capture(&mut self) -> CamwatchResult<()> {
        self.state = MonitorState::Capturing;

        self.sessions.release_for_capture()?;
        match self.recorder.capture(self.clock.wall_unix_secs()).await? {
            CaptureOutcome::Recorded(report) => {
                self.captures += 1;
                tracing::info!(
                    output = %report.output.display(),
                    attempts = report.attempts,
                    "Capture complete"
                );
            }
            CaptureOutcome::Skipped => {}
        }
        self.sessions.reopen_after_capture().await?;

        // The fresh session drifts while auto-exposure settles; restart
        // the cooldown and rebuild the reference from the next frame.
        self.gate.rearm(self.clock.elapsed_ns());
        self.reference = None;
        self.state = MonitorState::Monitoring;
        Ok(())
    }
}
