//! Pipeline error taxonomy.
//!
//! Whole-run failures (`TranscriptionUnavailable`, `RankingUnavailable`,
//! invalid manual input) abort before any rendering begins. Per-proposal and
//! per-clip failures are absorbed into diagnostics and the final summary so a
//! multi-clip run always produces whatever output it can.

use std::path::PathBuf;

use thiserror::Error;

use crate::selector::SelectError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("video not found: {0}")]
    VideoNotFound(PathBuf),

    #[error("subtitle file not found: {0}")]
    SubtitleNotFound(PathBuf),

    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("ranking unavailable: {0}")]
    RankingUnavailable(#[from] sclip_rank::RankError),

    #[error(transparent)]
    InvalidRange(#[from] SelectError),

    #[error("no valid clips to process after validation")]
    NoValidClips,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("media error: {0}")]
    Media(#[from] sclip_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn transcription_unavailable(message: impl Into<String>) -> Self {
        Self::TranscriptionUnavailable(message.into())
    }
}
