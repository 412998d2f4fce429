//! Transcript resolution.
//!
//! Transcription itself is an external collaborator: either the user supplies
//! an SRT, one already sits next to the video, or the `whisper` CLI is
//! invoked to produce one. When none of those pan out in AI mode, the run
//! aborts with `TranscriptionUnavailable` before any rendering starts.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

/// An SRT file sitting next to the video (`talk.mp4` → `talk.srt`).
pub fn find_sibling_srt(video: &Path) -> Option<PathBuf> {
    let srt = video.with_extension("srt");
    srt.is_file().then_some(srt)
}

/// Run the external `whisper` CLI to produce `<video stem>.srt` next to the
/// video.
pub async fn transcribe_with_whisper(video: &Path) -> PipelineResult<PathBuf> {
    which::which("whisper").map_err(|_| {
        PipelineError::transcription_unavailable(
            "whisper CLI not found in PATH (install openai-whisper)",
        )
    })?;

    let output_dir = video
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    info!(video = %video.display(), "transcribing with whisper");

    let status = Command::new("whisper")
        .arg(video)
        .args(["--model", "medium", "--output_format", "srt", "--output_dir"])
        .arg(&output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| {
            PipelineError::transcription_unavailable(format!("failed to spawn whisper: {e}"))
        })?;

    if !status.success() {
        return Err(PipelineError::transcription_unavailable(format!(
            "whisper exited with status {:?}",
            status.code()
        )));
    }

    let srt = video.with_extension("srt");
    if !srt.is_file() {
        return Err(PipelineError::transcription_unavailable(format!(
            "whisper did not produce {}",
            srt.display()
        )));
    }

    info!(srt = %srt.display(), "transcription complete");
    Ok(srt)
}

/// Resolve the subtitle file for a run.
///
/// Order: explicit path (must exist) → sibling SRT → whisper when
/// `transcribe` is set → `None`. Callers decide whether a missing transcript
/// is fatal (AI mode) or fine (manual mode).
pub async fn resolve_srt(
    video: &Path,
    explicit: Option<&Path>,
    transcribe: bool,
) -> PipelineResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(PipelineError::SubtitleNotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Some(sibling) = find_sibling_srt(video) {
        info!(srt = %sibling.display(), "found existing subtitle file");
        return Ok(Some(sibling));
    }

    if transcribe {
        return Ok(Some(transcribe_with_whisper(video).await?));
    }

    Ok(None)
}
