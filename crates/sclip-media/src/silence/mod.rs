//! Silence detection.
//!
//! Audio is extracted to 16 kHz mono PCM, reduced to windowed RMS levels and
//! run through a two-state scanner that classifies spans at or below the
//! noise floor. Detection never cuts anything; it only produces
//! [`SilenceInterval`]s for the render plan builder to act on.

mod analyze;
mod scanner;

use std::path::Path;

use tracing::debug;

use sclip_models::{merge_silence_intervals, SilenceInterval};

use crate::error::MediaResult;

pub use analyze::extract_audio_levels;
pub use scanner::{scan_levels, LevelFrame};

/// Tuning knobs for silence detection.
///
/// Defaults follow the level-based detection of the source pipeline: a
/// −30 dBFS floor held for at least half a second counts as silence, and
/// silences separated by less than half a second of speech are merged so the
/// cut list does not degenerate into micro-cuts.
#[derive(Debug, Clone)]
pub struct SilenceConfig {
    /// Level at or below which audio counts as silent (dBFS).
    pub noise_floor_db: f32,
    /// Minimum silence duration before a span is reported (seconds).
    pub min_silence: f64,
    /// Silences separated by less speech than this are merged (seconds).
    pub merge_gap: f64,
    /// Kept segments shorter than this are discarded from the cut list
    /// (seconds).
    pub min_keep_segment: f64,
    /// If removing silence would keep less than this fraction of the clip,
    /// silence removal is skipped for that clip.
    pub min_keep_ratio: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            noise_floor_db: -30.0,
            min_silence: 0.5,
            merge_gap: 0.5,
            min_keep_segment: 0.05,
            min_keep_ratio: 0.1,
        }
    }
}

/// Detect silence within `[start, end)` of `input`.
///
/// Returned intervals are clip-local, sorted, non-overlapping and already
/// merged per [`SilenceConfig::merge_gap`].
pub async fn detect_silence(
    input: &Path,
    start: f64,
    end: f64,
    config: &SilenceConfig,
) -> MediaResult<Vec<SilenceInterval>> {
    let duration = (end - start).max(0.0);
    if duration == 0.0 {
        return Ok(Vec::new());
    }

    let levels = extract_audio_levels(input, start, duration).await?;
    debug!(
        frames = levels.len(),
        noise_floor_db = config.noise_floor_db,
        "scanning audio levels for silence"
    );

    let raw = scan_levels(&levels, duration, config);
    let merged = merge_silence_intervals(&raw, config.merge_gap);

    debug!(
        raw = raw.len(),
        merged = merged.len(),
        silent_secs = merged.iter().map(|i| i.duration()).sum::<f64>(),
        "silence detection complete"
    );

    Ok(merged)
}
