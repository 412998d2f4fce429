//! Segment selection: raw proposals in, validated non-overlapping clip
//! proposals out.
//!
//! Manual mode validates a single user-supplied span and fails hard on bad
//! input. AI mode is lenient: individual proposals that cannot be repaired
//! are dropped with a diagnostic and the rest of the batch proceeds. Both
//! paths are pure functions of their inputs — same transcript and ranking
//! response, same output.

use thiserror::Error;
use tracing::debug;

use sclip_models::proposal::ClipProposal;
use sclip_models::timestamp::{parse_timestamp, TimestampError};
use sclip_models::transcript::Transcript;
use sclip_rank::RankedClip;

/// Duration window for selected clips.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub min_duration: f64,
    pub max_duration: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_duration: 15.0,
            max_duration: 60.0,
        }
    }
}

/// Fatal selection errors (manual mode input).
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("invalid range: {0}")]
    InvalidTimestamp(#[from] TimestampError),

    #[error("invalid range: start ({start}) must be before end ({end})")]
    StartNotBeforeEnd { start: String, end: String },

    #[error("invalid range: [{start:.1}s, {end:.1}s] is outside the video (duration {duration:.1}s)")]
    OutOfBounds { start: f64, end: f64, duration: f64 },
}

/// A proposal that was repaired or dropped; non-fatal, reported and skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionDiagnostic {
    ProposalRejected {
        /// 1-based position in the ranking response.
        position: usize,
        title: String,
        reason: String,
    },
}

impl std::fmt::Display for SelectionDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProposalRejected {
                position,
                title,
                reason,
            } => write!(f, "proposal {position} '{title}' rejected: {reason}"),
        }
    }
}

/// Validate a manual (start, end, title) triple against the video duration.
///
/// The end bound is clamped to the video duration with a one-second grace;
/// anything further out is an error, as is a reversed or out-of-range span.
pub fn select_manual(
    start: &str,
    end: &str,
    title: &str,
    video_duration: f64,
) -> Result<ClipProposal, SelectError> {
    let start_secs = parse_timestamp(start)?;
    let end_secs = parse_timestamp(end)?;

    if start_secs >= end_secs {
        return Err(SelectError::StartNotBeforeEnd {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    if start_secs >= video_duration || end_secs > video_duration + 1.0 {
        return Err(SelectError::OutOfBounds {
            start: start_secs,
            end: end_secs,
            duration: video_duration,
        });
    }

    Ok(ClipProposal {
        index: 1,
        start: start_secs,
        end: end_secs.min(video_duration),
        title: if title.trim().is_empty() {
            "clip".to_string()
        } else {
            title.trim().to_string()
        },
        rationale: None,
    })
}

/// Turn a ranking response into validated, non-overlapping proposals.
pub fn select_ranked(
    transcript: &Transcript,
    ranked: &[RankedClip],
    video_duration: f64,
    config: &SelectorConfig,
) -> (Vec<ClipProposal>, Vec<SelectionDiagnostic>) {
    let mut diagnostics = Vec::new();
    let mut candidates: Vec<(usize, Option<f64>, ClipProposal)> = Vec::new();

    for (i, raw) in ranked.iter().enumerate() {
        let position = i + 1;
        let title = if raw.title.trim().is_empty() {
            format!("clip_{position}")
        } else {
            raw.title.trim().to_string()
        };

        let (start, end) = match (
            parse_timestamp(&raw.start_time),
            parse_timestamp(&raw.end_time),
        ) {
            (Ok(s), Ok(e)) => (s, e),
            (Err(e), _) | (_, Err(e)) => {
                diagnostics.push(rejected(position, &title, format!("unparseable timestamp: {e}")));
                continue;
            }
        };

        if start >= end {
            diagnostics.push(rejected(
                position,
                &title,
                format!("start ({start:.1}s) is not before end ({end:.1}s)"),
            ));
            continue;
        }
        if start >= video_duration {
            diagnostics.push(rejected(
                position,
                &title,
                format!("starts past the end of the video ({video_duration:.1}s)"),
            ));
            continue;
        }

        // Clamp into the video, then into the duration window by trimming
        // from the end (the longer side); too-short proposals have nothing
        // left to trim and are dropped.
        let end = end.min(video_duration);
        let duration = end - start;
        let end = if duration > config.max_duration {
            start + config.max_duration
        } else {
            end
        };
        if end - start < config.min_duration {
            diagnostics.push(rejected(
                position,
                &title,
                format!(
                    "duration {:.1}s is below the minimum of {:.1}s",
                    end - start,
                    config.min_duration
                ),
            ));
            continue;
        }

        let rationale = {
            let text = transcript.text_in_range(start, end);
            if text.is_empty() { None } else { Some(text) }
        };

        candidates.push((
            position,
            raw.score,
            ClipProposal {
                index: 0, // assigned after overlap resolution
                start,
                end,
                title,
                rationale,
            },
        ));
    }

    // Rank order: provider score descending when given, start time otherwise.
    candidates.sort_by(|a, b| {
        let score_a = a.1.unwrap_or(f64::NEG_INFINITY);
        let score_b = b.1.unwrap_or(f64::NEG_INFINITY);
        score_b
            .total_cmp(&score_a)
            .then(a.2.start.total_cmp(&b.2.start))
    });

    // De-overlap: a later-ranked proposal loses its head to every
    // earlier-ranked one it collides with.
    let mut accepted: Vec<ClipProposal> = Vec::new();
    for (position, _, mut proposal) in candidates {
        for other in &accepted {
            if proposal.overlaps(other) {
                proposal.start = proposal.start.max(other.end);
            }
        }

        if proposal.end - proposal.start <= 0.0 {
            diagnostics.push(SelectionDiagnostic::ProposalRejected {
                position,
                title: proposal.title,
                reason: "fully covered by a higher-ranked proposal".to_string(),
            });
            continue;
        }
        if proposal.end - proposal.start < config.min_duration {
            diagnostics.push(SelectionDiagnostic::ProposalRejected {
                position,
                title: proposal.title,
                reason: format!(
                    "overlap trimming left {:.1}s, below the minimum of {:.1}s",
                    proposal.end - proposal.start,
                    config.min_duration
                ),
            });
            continue;
        }

        accepted.push(proposal);
    }

    for (i, proposal) in accepted.iter_mut().enumerate() {
        proposal.index = i as u32 + 1;
    }

    debug!(
        accepted = accepted.len(),
        rejected = diagnostics.len(),
        "selection complete"
    );

    (accepted, diagnostics)
}

fn rejected(position: usize, title: &str, reason: String) -> SelectionDiagnostic {
    SelectionDiagnostic::ProposalRejected {
        position,
        title: title.to_string(),
        reason,
    }
}
