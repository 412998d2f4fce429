//! Transcript segments and SRT parsing/writing.
//!
//! The transcription collaborator (or a user-supplied subtitle file) yields an
//! ordered sequence of timestamped text segments. SRT is the only interchange
//! format: it is what external transcribers emit and what FFmpeg's
//! `subtitles` filter consumes.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// A single timestamped piece of transcript text.
///
/// Segments are ordered, non-overlapping and immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Caption text (may span multiple lines joined with '\n').
    pub text: String,
}

/// An ordered transcript with the raw source text retained for prompting.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    /// Raw SRT content, passed verbatim to the ranking provider.
    pub raw: String,
}

impl Transcript {
    /// Parse SRT content into a transcript.
    ///
    /// Malformed blocks are skipped rather than failing the whole file;
    /// subtitle tooling in the wild produces plenty of stray blocks.
    pub fn parse_srt(content: &str) -> Self {
        let mut segments = Vec::new();

        for block in content.replace("\r\n", "\n").split("\n\n") {
            let mut lines = block.lines().filter(|l| !l.trim().is_empty());

            // Index line is optional in practice; the timing line is not.
            let Some(first) = lines.next() else { continue };
            let timing = if first.contains("-->") {
                first
            } else {
                match lines.next() {
                    Some(l) if l.contains("-->") => l,
                    _ => continue,
                }
            };

            let Some((start, end)) = parse_srt_timing(timing) else {
                continue;
            };
            if end <= start {
                continue;
            }

            let text: Vec<&str> = lines.map(str::trim).collect();
            if text.is_empty() {
                continue;
            }

            segments.push(TranscriptSegment {
                start,
                end,
                text: text.join("\n"),
            });
        }

        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        Self {
            segments,
            raw: content.to_string(),
        }
    }

    /// Segments overlapping the half-open range `[start, end)`.
    pub fn segments_in_range(
        &self,
        start: f64,
        end: f64,
    ) -> impl Iterator<Item = &TranscriptSegment> + '_ {
        self.segments
            .iter()
            .filter(move |s| s.start < end && s.end > start)
    }

    /// Join the text of all segments overlapping `[start, end)`.
    pub fn text_in_range(&self, start: f64, end: f64) -> String {
        self.segments_in_range(start, end)
            .map(|s| s.text.replace('\n', " "))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serialize segments back to SRT.
pub fn write_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(seg.start),
            format_srt_timestamp(seg.end),
            seg.text
        );
    }
    out
}

/// Parse an SRT timing line: `HH:MM:SS,mmm --> HH:MM:SS,mmm`.
fn parse_srt_timing(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    Some((
        parse_srt_timestamp(start.trim())?,
        parse_srt_timestamp(end.trim())?,
    ))
}

fn parse_srt_timestamp(ts: &str) -> Option<f64> {
    // SRT uses a comma for the millisecond separator; tolerate a dot too.
    let ts = ts.replace(',', ".");
    let mut parts = ts.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Format seconds as an SRT timestamp: `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let whole = total as u64;
    let millis = ((total - whole as f64) * 1000.0).round() as u64;
    // Rounding can push millis to 1000; carry into the seconds field.
    let (whole, millis) = if millis >= 1000 {
        (whole + 1, millis - 1000)
    } else {
        (whole, millis)
    };
    format!(
        "{:02}:{:02}:{:02},{:03}",
        whole / 3600,
        (whole % 3600) / 60,
        whole % 60,
        millis
    )
}
