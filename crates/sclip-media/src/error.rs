//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing, analyzing or rendering media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid video file: {0}")]
    InvalidVideo(String),

    #[error("ffmpeg produced an empty output: {0}")]
    EmptyOutput(PathBuf),

    #[error("face detection unavailable: {0}")]
    DetectionUnavailable(String),

    #[error("audio stream too short for analysis")]
    AudioTooShort,

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an ffmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a detection-unavailable error.
    pub fn detection_unavailable(message: impl Into<String>) -> Self {
        Self::DetectionUnavailable(message.into())
    }

    /// Whether a retry with a software encoder profile is worth attempting.
    pub fn is_encode_failure(&self) -> bool {
        matches!(
            self,
            Self::FfmpegFailed { .. } | Self::Timeout(_) | Self::EmptyOutput(_)
        )
    }
}
