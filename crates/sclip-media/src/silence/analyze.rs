//! Audio level extraction.
//!
//! FFmpeg decodes the clip's audio to raw 16 kHz mono f32 samples in a
//! temporary file; the samples are reduced to 50 ms RMS windows for the
//! scanner. Keeping the decode external means any container or codec ffmpeg
//! understands works here.

use std::path::Path;
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

use super::scanner::LevelFrame;

/// Sample rate for analysis audio.
const ANALYSIS_SAMPLE_RATE: usize = 16_000;

/// RMS window length in milliseconds.
const WINDOW_MS: usize = 50;

/// Level reported for an all-zero window (digital silence).
const SILENCE_FLOOR_DB: f32 = -120.0;

/// Extract windowed RMS levels for `duration` seconds starting at `start`.
pub async fn extract_audio_levels(
    input: &Path,
    start: f64,
    duration: f64,
) -> MediaResult<Vec<LevelFrame>> {
    let temp = NamedTempFile::new()?;
    extract_pcm(input, temp.path(), start, duration).await?;

    let samples = load_samples(temp.path()).await?;
    if samples.is_empty() {
        return Err(MediaError::AudioTooShort);
    }

    debug!(samples = samples.len(), "loaded analysis audio");
    Ok(window_rms(&samples))
}

/// Decode `[start, start+duration)` to raw f32le mono PCM.
async fn extract_pcm(input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let seek = format!("{start:.3}");
    let span = format!("{duration:.3}");
    let rate = ANALYSIS_SAMPLE_RATE.to_string();

    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-ss", seek.as_str(), "-t", span.as_str(), "-i"])
        .arg(input)
        .args(["-vn", "-ar", rate.as_str(), "-ac", "1", "-f", "f32le"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(MediaError::ffmpeg_failed(
            "audio extraction failed",
            None,
            status.code(),
        ));
    }
    Ok(())
}

/// Read raw little-endian f32 samples.
async fn load_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Reduce samples to per-window RMS levels in dBFS.
fn window_rms(samples: &[f32]) -> Vec<LevelFrame> {
    let window = ANALYSIS_SAMPLE_RATE * WINDOW_MS / 1000;
    let mut frames = Vec::with_capacity(samples.len() / window + 1);

    for (i, chunk) in samples.chunks(window).enumerate() {
        if chunk.len() < window / 2 {
            break;
        }
        let mean_sq: f32 = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
        let rms = mean_sq.sqrt();
        let level_db = if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            SILENCE_FLOOR_DB
        };
        frames.push(LevelFrame {
            timestamp: (i * WINDOW_MS) as f64 / 1000.0,
            level_db,
        });
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_hits_floor() {
        let samples = vec![0.0f32; ANALYSIS_SAMPLE_RATE];
        let frames = window_rms(&samples);
        assert_eq!(frames.len(), 20);
        assert!(frames.iter().all(|f| f.level_db <= SILENCE_FLOOR_DB));
    }

    #[test]
    fn rms_of_full_scale_is_zero_db() {
        let samples = vec![1.0f32; ANALYSIS_SAMPLE_RATE / 2];
        let frames = window_rms(&samples);
        assert!(!frames.is_empty());
        assert!(frames[0].level_db.abs() < 0.01);
    }

    #[test]
    fn window_timestamps_advance() {
        let samples = vec![0.5f32; ANALYSIS_SAMPLE_RATE];
        let frames = window_rms(&samples);
        assert!((frames[1].timestamp - 0.05).abs() < 1e-9);
        assert!((frames[10].timestamp - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_pcm_file_loads_empty() {
        let temp = NamedTempFile::new().unwrap();
        let samples = load_samples(temp.path()).await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn pcm_round_trip() {
        let temp = NamedTempFile::new().unwrap();
        let values: Vec<f32> = vec![0.0, 0.5, -1.0, 1.0];
        let bytes: Vec<u8> = values.iter().flat_map(|f| f.to_le_bytes()).collect();
        tokio::fs::write(temp.path(), &bytes).await.unwrap();

        let loaded = load_samples(temp.path()).await.unwrap();
        assert_eq!(loaded, values);
    }
}
