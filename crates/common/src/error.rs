//! Error types shared across camwatch crates.

use std::path::PathBuf;

/// Top-level error type for camwatch operations.
#[derive(Debug, thiserror::Error)]
pub enum CamwatchError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Recorder error: {message}")]
    Recorder { message: String },

    #[error("Motion analysis error: {message}")]
    Motion { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CamwatchError.
pub type CamwatchResult<T> = Result<T, CamwatchError>;

impl CamwatchError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder {
            message: msg.into(),
        }
    }

    pub fn motion(msg: impl Into<String>) -> Self {
        Self::Motion {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
