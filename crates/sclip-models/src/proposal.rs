//! Clip proposals.

use serde::{Deserialize, Serialize};

/// A validated candidate span selected for rendering as a short.
///
/// Produced by the selector; times are absolute source seconds. A proposal is
/// immutable once built and invariants (`end > start`, duration within the
/// configured window, pairwise non-overlap) are enforced at selection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipProposal {
    /// 1-based position in the selection output; drives output naming.
    pub index: u32,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Display title, rendered as the overlay headline.
    pub title: String,
    /// Transcript text backing this proposal, if any.
    pub rationale: Option<String>,
}

impl ClipProposal {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether two proposals overlap in time.
    pub fn overlaps(&self, other: &ClipProposal) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Sanitize a title for use in a filename: keep `[A-Za-z0-9_-]`, cap at 50
/// characters.
pub fn sanitize_title(title: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    safe.chars().take(50).collect()
}

/// Deterministic output file stem for a proposal: `NN_safe_title`.
pub fn output_basename(proposal: &ClipProposal) -> String {
    format!("{:02}_{}", proposal.index, sanitize_title(&proposal.title))
}
