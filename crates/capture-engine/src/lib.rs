//! camwatch Capture Engine
//!
//! Orchestrates the surveillance loop: frame acquisition, motion-triggered
//! handoff of the camera device to an external recorder, and the session
//! lifecycle around each handoff.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 MotionMonitor                     │
//! │  ┌───────────────┐        ┌─────────────────────┐ │
//! │  │ SessionManager │ frames │   MotionDetector    │ │
//! │  │ (FrameSource)  ├───────▶│ + CaptureGate       │ │
//! │  └───────┬────────┘        └──────────┬──────────┘ │
//! │          │ close / reopen             │ handoff    │
//! │          ▼                            ▼            │
//! │  ┌────────────────────────────────────────────────┐│
//! │  │ RecorderInvoker (DeviceGate ▶ RecorderBackend) ││
//! │  │           <unix_ts>.mkv per capture            ││
//! │  └────────────────────────────────────────────────┘│
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The camera device is a singular physical resource: exclusivity between
//! the monitoring reader and the recorder is enforced by strict sequencing
//! (close-before-record, gate-before-record), not by a lock.

pub mod gate;
pub mod monitor;
pub mod recorder;
pub mod session;
pub mod source;

pub use gate::{DeviceGate, DeviceProbe, LsofProbe};
pub use monitor::{
    ControlCommand, ControlInput, MonitorState, MotionMonitor, NoControl, StdinControl, StopReason,
};
pub use recorder::{
    CaptureOutcome, CaptureReport, FfmpegRecorder, RecorderBackend, RecorderConfig, RecorderInvoker,
    RecorderRun, RecorderTask,
};
pub use session::{SessionConfig, SessionManager};
pub use source::{FrameSource, GstSourceOpener, SourceOpener};
