//! Record a single clip immediately.

use std::path::PathBuf;
use std::time::Duration;

use camwatch_capture_engine::{
    CaptureOutcome, DeviceGate, FfmpegRecorder, LsofProbe, RecorderConfig, RecorderInvoker,
};
use camwatch_common::clock::MonitorClock;
use camwatch_common::config::AppConfig;

pub async fn run(
    config: AppConfig,
    device: Option<PathBuf>,
    duration: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let device = device.unwrap_or_else(|| config.device.clone());
    let output_dir = output.unwrap_or_else(|| config.captures_dir.clone());
    let capture_secs = duration.unwrap_or(config.watch.capture_secs);
    std::fs::create_dir_all(&output_dir)?;

    println!("Recording {capture_secs}s from {}", device.display());

    let gate = DeviceGate::new(
        Box::new(LsofProbe::new(&device)),
        Duration::from_millis(config.watch.poll_interval_ms),
    );
    let mut invoker = RecorderInvoker::new(
        RecorderConfig {
            device,
            output_dir,
            container: config.watch.container.clone(),
            capture_duration: Duration::from_secs(capture_secs),
            timeout_margin: Duration::from_secs(config.watch.timeout_margin_secs),
            skip_recording: false,
        },
        gate,
        Box::new(FfmpegRecorder::new(
            config.watch.video_size.clone(),
            config.watch.input_format.clone(),
        )),
    );

    let clock = MonitorClock::start();
    if let CaptureOutcome::Recorded(report) = invoker.capture(clock.wall_unix_secs()).await? {
        println!(
            "Saved {} ({} attempt(s), exit code {:?})",
            report.output.display(),
            report.attempts,
            report.exit_code
        );
    }

    Ok(())
}
