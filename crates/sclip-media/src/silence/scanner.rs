//! Level scanner: windowed RMS levels in, silence intervals out.
//!
//! Two-state machine over a stream of level frames:
//!
//! ```text
//! ┌─────────┐  level <= floor   ┌──────────┐
//! │ InSpeech│──────────────────►│ InSilence│
//! └─────────┘                   └──────────┘
//!      ▲        level > floor        │
//!      └─────────────────────────────┘
//!            span >= min_silence → report interval
//! ```
//!
//! Dips shorter than the minimum silence duration are ignored so natural
//! speech pauses do not produce choppy cuts.

use sclip_models::SilenceInterval;

use super::SilenceConfig;

/// One analysis window: timestamp of its start and its RMS level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelFrame {
    /// Clip-local timestamp in seconds.
    pub timestamp: f64,
    /// RMS level in dBFS.
    pub level_db: f32,
}

enum State {
    InSpeech,
    InSilence { since: f64 },
}

/// Classify silence spans from level frames.
///
/// Frames must be in timestamp order. Output intervals are clamped to
/// `[0, duration)` and not yet merged — merging is a separate, idempotent
/// pass.
pub fn scan_levels(
    frames: &[LevelFrame],
    duration: f64,
    config: &SilenceConfig,
) -> Vec<SilenceInterval> {
    let mut intervals = Vec::new();
    // Assume silence from t=0 so leading dead air is caught.
    let mut state = State::InSilence { since: 0.0 };

    for frame in frames {
        let silent = frame.level_db <= config.noise_floor_db;
        match (&state, silent) {
            (State::InSilence { since }, false) => {
                let span = frame.timestamp - since;
                if span >= config.min_silence {
                    intervals.push(SilenceInterval::new(
                        since.clamp(0.0, duration),
                        frame.timestamp.clamp(0.0, duration),
                    ));
                }
                state = State::InSpeech;
            }
            (State::InSpeech, true) => {
                state = State::InSilence {
                    since: frame.timestamp,
                };
            }
            _ => {}
        }
    }

    if let State::InSilence { since } = state {
        if duration - since >= config.min_silence {
            intervals.push(SilenceInterval::new(since.clamp(0.0, duration), duration));
        }
    }

    intervals.retain(|i| i.end > i.start);
    intervals
}
