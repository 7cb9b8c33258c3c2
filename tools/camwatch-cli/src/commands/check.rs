//! Check system capabilities.

use camwatch_capture_engine::gate::{lsof_available, DeviceProbe, LsofProbe};
use camwatch_capture_engine::recorder::ffmpeg_available;
use camwatch_capture_engine::source::gst_available;
use camwatch_common::config::AppConfig;

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("camwatch System Check");
    println!("{}", "=".repeat(50));

    // Device node
    if config.device.exists() {
        println!("[OK] Device node present: {}", config.device.display());
        let mut probe = LsofProbe::new(&config.device);
        if probe.is_busy() {
            println!("[WARN] Device is currently held open by another process");
        } else {
            println!("[OK] Device is free");
        }
    } else {
        println!("[WARN] Device node missing: {}", config.device.display());
    }

    // External tools
    if ffmpeg_available() {
        println!("[OK] ffmpeg found on PATH");
    } else {
        println!("[FAIL] ffmpeg not found (recording will not work)");
    }
    if lsof_available() {
        println!("[OK] lsof found on PATH");
    } else {
        println!("[WARN] lsof not found (the device gate will treat the device as always free)");
    }

    // Frame source
    if gst_available() {
        println!("[OK] GStreamer initialized");
    } else {
        println!("[FAIL] GStreamer failed to initialize (the frame source will not work)");
    }

    println!();
    println!("Captures directory: {}", config.captures_dir.display());

    Ok(())
}
