//! Run the monitoring loop.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use camwatch_capture_engine::{
    ControlInput, DeviceGate, FfmpegRecorder, GstSourceOpener, LsofProbe, MotionMonitor, NoControl,
    RecorderConfig, RecorderInvoker, SessionConfig, SessionManager, StdinControl,
};
use camwatch_common::config::AppConfig;
use camwatch_motion_core::{CaptureGate, DetectorConfig, MotionDetector};

pub async fn run(
    config: AppConfig,
    device: Option<PathBuf>,
    no_rec: bool,
    min_area: u32,
    duration: Option<u64>,
    output: Option<PathBuf>,
    interactive: bool,
) -> anyhow::Result<()> {
    let device = device.unwrap_or_else(|| config.device.clone());
    let output_dir = output.unwrap_or_else(|| config.captures_dir.clone());
    let capture_secs = duration.unwrap_or(config.watch.capture_secs);
    std::fs::create_dir_all(&output_dir)?;

    println!("Watching device: {}", device.display());
    println!("  Min area: {min_area} px^2");
    println!("  Clip duration: {capture_secs}s");
    println!("  Recording: {}", if no_rec { "disabled" } else { "enabled" });
    println!("  Output: {}", output_dir.display());
    println!();

    let sessions = SessionManager::new(
        SessionConfig {
            settle_delay: Duration::from_secs_f64(config.watch.settle_secs),
            skip_recording: no_rec,
        },
        Box::new(GstSourceOpener::new(&device, config.watch.frame_width)),
    );

    let gate = DeviceGate::new(
        Box::new(LsofProbe::new(&device)),
        Duration::from_millis(config.watch.poll_interval_ms),
    );
    let recorder = RecorderInvoker::new(
        RecorderConfig {
            device: device.clone(),
            output_dir,
            container: config.watch.container.clone(),
            capture_duration: Duration::from_secs(capture_secs),
            timeout_margin: Duration::from_secs(config.watch.timeout_margin_secs),
            skip_recording: no_rec,
        },
        gate,
        Box::new(FfmpegRecorder::new(
            config.watch.video_size.clone(),
            config.watch.input_format.clone(),
        )),
    );

    let detector = MotionDetector::new(DetectorConfig {
        min_area,
        diff_threshold: config.watch.diff_threshold,
        ..DetectorConfig::default()
    });
    let capture_gate = CaptureGate::new(Duration::from_secs_f64(config.watch.ghosting_interval_secs));

    let control: Box<dyn ControlInput> = if interactive {
        Box::new(StdinControl::spawn())
    } else {
        Box::new(NoControl)
    };

    let mut monitor = MotionMonitor::new(sessions, recorder, detector, capture_gate, control);

    let stop = monitor.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    println!("Press Ctrl+C to stop watching...");
    println!();

    let reason = monitor.run().await?;
    println!(
        "Stopped ({reason:?}) after {} capture(s)",
        monitor.captures()
    );

    Ok(())
}
