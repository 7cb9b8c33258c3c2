//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Camera device node to watch and record from.
    pub device: PathBuf,

    /// Directory where capture artifacts are written.
    pub captures_dir: PathBuf,

    /// Default watch-loop settings.
    pub watch: WatchDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default watch-loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchDefaults {
    /// Minimum changed-region area (px^2) that counts as motion.
    pub min_area: u32,

    /// Per-pixel difference threshold for the binary motion mask.
    pub diff_threshold: u8,

    /// Capture cooldown absorbing post-reopen exposure drift (seconds).
    pub ghosting_interval_secs: f64,

    /// Duration of each recorded clip (seconds).
    pub capture_secs: u64,

    /// Margin added to the clip duration for the recorder hard timeout
    /// (seconds). Generous on purpose: it must absorb process startup and
    /// container finalization, not just encode time.
    pub timeout_margin_secs: u64,

    /// Wait after opening the camera before frames are trusted (seconds).
    pub settle_secs: f64,

    /// Device-gate poll interval (milliseconds).
    pub poll_interval_ms: u64,

    /// Width frames are scaled to for motion analysis.
    pub frame_width: u32,

    /// Container extension for capture artifacts.
    pub container: String,

    /// Recorder input frame size (passed to ffmpeg -video_size).
    pub video_size: String,

    /// Recorder input pixel format (passed to ffmpeg -input_format).
    pub input_format: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "camwatch=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/video0"),
            captures_dir: dirs_default_captures(),
            watch: WatchDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchDefaults {
    fn default() -> Self {
        Self {
            min_area: 500,
            diff_threshold: 25,
            ghosting_interval_secs: 2.0,
            capture_secs: 5,
            timeout_margin_secs: 10,
            settle_secs: 2.0,
            poll_interval_ms: 500,
            frame_width: 500,
            container: "mkv".to_string(),
            video_size: "4096x2160".to_string(),
            input_format: "mjpeg".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("camwatch").join("config.json")
}

/// Default captures directory.
fn dirs_default_captures() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("camwatch").join("captures")
}
