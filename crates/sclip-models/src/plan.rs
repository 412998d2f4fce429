//! Render plan building blocks: crop timeline, silence intervals, cut list
//! and overlay descriptors.
//!
//! Everything here is pure data. The media layer turns a [`RenderPlan`] into
//! an FFmpeg invocation; nothing in this module touches a process or a file.

use serde::{Deserialize, Serialize};

use crate::encoding::EncoderProfile;
use crate::proposal::ClipProposal;

/// A crop keyframe in normalized source coordinates.
///
/// `left`/`top` position a window of constant `width`/`height` (the size
/// never changes within a clip; only the position moves). The window always
/// lies within `[0,1]²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropWindow {
    /// Clip-local timestamp in seconds.
    pub time: f64,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropWindow {
    pub fn new(time: f64, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            time,
            left,
            top,
            width,
            height,
        }
    }

    /// Linear interpolation of position between two keyframes.
    pub fn lerp(a: &CropWindow, b: &CropWindow, t: f64) -> CropWindow {
        CropWindow {
            time: a.time + t * (b.time - a.time),
            left: a.left + t * (b.left - a.left),
            top: a.top + t * (b.top - a.top),
            width: a.width,
            height: a.height,
        }
    }
}

/// Interpolate the crop position at `time` from a sparse keyframe timeline.
pub fn interpolate_crop(windows: &[CropWindow], time: f64) -> Option<CropWindow> {
    let first = windows.first()?;
    if time <= first.time {
        return Some(*first);
    }
    let last = windows.last()?;
    if time >= last.time {
        return Some(*last);
    }
    for pair in windows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.time <= time && time <= b.time {
            let span = b.time - a.time;
            let t = if span > 0.0 { (time - a.time) / span } else { 0.0 };
            return Some(CropWindow::lerp(a, b, t));
        }
    }
    None
}

/// A span classified as silent, in clip-local seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: f64,
}

impl SilenceInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Merge silence intervals separated by less than `max_gap` seconds and drop
/// empty spans. Input order does not matter; output is sorted and
/// non-overlapping. Merging an already-merged set is a no-op.
pub fn merge_silence_intervals(
    intervals: &[SilenceInterval],
    max_gap: f64,
) -> Vec<SilenceInterval> {
    let mut sorted: Vec<SilenceInterval> = intervals
        .iter()
        .copied()
        .filter(|i| i.end > i.start)
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<SilenceInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(prev) if interval.start - prev.end < max_gap => {
                prev.end = prev.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// The kept portions of a clip: the complement of its silence intervals.
///
/// Spans are clip-local, sorted and non-overlapping. An empty cut list is
/// invalid; a cut-free clip is represented by a single span covering the
/// whole duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutList {
    pub keeps: Vec<(f64, f64)>,
}

impl CutList {
    /// A single keep spanning `[0, duration)`.
    pub fn full(duration: f64) -> Self {
        Self {
            keeps: vec![(0.0, duration)],
        }
    }

    /// Complement pre-merged silence intervals within `[0, duration)`,
    /// discarding kept fragments shorter than `min_keep`.
    pub fn from_silence(silence: &[SilenceInterval], duration: f64, min_keep: f64) -> Self {
        let mut keeps = Vec::new();
        let mut cursor = 0.0;

        for interval in silence {
            let start = interval.start.clamp(0.0, duration);
            let end = interval.end.clamp(0.0, duration);
            if start > cursor {
                keeps.push((cursor, start));
            }
            cursor = cursor.max(end);
        }
        if cursor < duration {
            keeps.push((cursor, duration));
        }

        keeps.retain(|(s, e)| e - s >= min_keep);
        Self { keeps }
    }

    /// Whether this is a single span covering (almost) the full duration.
    pub fn is_full(&self, duration: f64) -> bool {
        match self.keeps.as_slice() {
            [(start, end)] => *start <= 0.05 && *end >= duration - 0.05,
            _ => false,
        }
    }

    /// Total kept duration on the source timeline.
    pub fn kept_duration(&self) -> f64 {
        self.keeps.iter().map(|(s, e)| e - s).sum()
    }

    /// Map a clip-local source time into the output timeline.
    ///
    /// Output time is the kept duration preceding `t`, divided by the speed
    /// factor (cuts happen on the original timeline, speed applies after).
    /// Returns `None` for times inside a removed span.
    pub fn source_to_output(&self, t: f64, speed: f64) -> Option<f64> {
        let mut kept_before = 0.0;
        for &(start, end) in &self.keeps {
            if t < start {
                return None;
            }
            if t <= end {
                return Some((kept_before + (t - start)) / speed);
            }
            kept_before += end - start;
        }
        None
    }

    /// Reconstruct the source time for an output time.
    pub fn output_to_source(&self, out_t: f64, speed: f64) -> Option<f64> {
        let mut target = out_t * speed;
        for &(start, end) in &self.keeps {
            let len = end - start;
            if target <= len {
                return Some(start + target);
            }
            target -= len;
        }
        None
    }
}

/// Title text split into at most two display lines.
///
/// Titles longer than four words break at the midpoint, mirroring how the
/// headline is laid out on the vertical canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleOverlay {
    pub line1: String,
    pub line2: Option<String>,
}

impl TitleOverlay {
    pub fn from_title(title: &str) -> Self {
        let words: Vec<&str> = title.split_whitespace().collect();
        if words.len() > 4 {
            let mid = words.len().div_ceil(2);
            Self {
                line1: words[..mid].join(" "),
                line2: Some(words[mid..].join(" ")),
            }
        } else {
            Self {
                line1: words.join(" "),
                line2: None,
            }
        }
    }
}

/// Overlay descriptors, all expressed in output (cropped, vertical) space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlays {
    pub title: TitleOverlay,
    /// Subtitle file burned into the frame, if any.
    pub subtitles: Option<std::path::PathBuf>,
    /// Whether to draw the blinking call-to-action banner.
    pub cta: bool,
}

/// The complete declarative description of one clip render.
///
/// Owned by the orchestrator for the duration of a single encode invocation,
/// then discarded. Building a plan never mutates its inputs.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub proposal: ClipProposal,
    /// Kept spans, clip-local, on the un-sped source timeline.
    pub cuts: CutList,
    /// Sparse crop keyframe timeline, clip-local.
    pub crop: Vec<CropWindow>,
    pub overlays: Overlays,
    /// Uniform speed factor applied after cuts.
    pub speed: f64,
    pub encoder: EncoderProfile,
}

impl RenderPlan {
    /// Duration of the final output in seconds.
    pub fn output_duration(&self) -> f64 {
        self.cuts.kept_duration() / self.speed
    }

    /// Plan equality ignoring the encoder profile.
    ///
    /// The hardware→software fallback must re-encode the same cuts, crops and
    /// overlays; only codec parameters may differ.
    pub fn semantic_eq(&self, other: &RenderPlan) -> bool {
        self.proposal == other.proposal
            && self.cuts == other.cuts
            && self.crop == other.crop
            && self.overlays == other.overlays
            && self.speed == other.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_joins_close_intervals() {
        let intervals = vec![SilenceInterval::new(2.0, 3.0), SilenceInterval::new(3.4, 4.0)];
        let merged = merge_silence_intervals(&intervals, 0.5);
        assert_eq!(merged, vec![SilenceInterval::new(2.0, 4.0)]);
    }

    #[test]
    fn merge_keeps_distant_intervals() {
        let intervals = vec![SilenceInterval::new(1.0, 2.0), SilenceInterval::new(4.0, 5.0)];
        let merged = merge_silence_intervals(&intervals, 0.5);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let intervals = vec![
            SilenceInterval::new(2.0, 3.0),
            SilenceInterval::new(3.4, 4.0),
            SilenceInterval::new(10.0, 11.0),
        ];
        let once = merge_silence_intervals(&intervals, 0.5);
        let twice = merge_silence_intervals(&once, 0.5);
        assert_eq!(once, twice);
    }

    #[test]
    fn cut_list_complements_silence() {
        let silence = vec![SilenceInterval::new(1.0, 2.0), SilenceInterval::new(3.5, 4.0)];
        let cuts = CutList::from_silence(&silence, 6.0, 0.05);
        assert_eq!(cuts.keeps, vec![(0.0, 1.0), (2.0, 3.5), (4.0, 6.0)]);
        assert!((cuts.kept_duration() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn cut_list_clamps_to_duration() {
        let silence = vec![SilenceInterval::new(-1.0, 0.5), SilenceInterval::new(5.0, 9.0)];
        let cuts = CutList::from_silence(&silence, 6.0, 0.05);
        assert_eq!(cuts.keeps, vec![(0.5, 5.0)]);
    }

    #[test]
    fn cut_list_drops_tiny_fragments() {
        let silence = vec![SilenceInterval::new(0.0, 1.0), SilenceInterval::new(1.02, 5.0)];
        let cuts = CutList::from_silence(&silence, 6.0, 0.05);
        assert_eq!(cuts.keeps, vec![(5.0, 6.0)]);
    }

    #[test]
    fn full_detection() {
        assert!(CutList::full(10.0).is_full(10.0));
        let cuts = CutList {
            keeps: vec![(0.0, 4.0), (5.0, 10.0)],
        };
        assert!(!cuts.is_full(10.0));
    }

    #[test]
    fn time_mapping_round_trips() {
        let cuts = CutList {
            keeps: vec![(0.0, 2.0), (3.0, 5.0)],
        };
        let speed = 1.2;

        // Inside the first keep.
        let out = cuts.source_to_output(1.0, speed).unwrap();
        assert!((out - 1.0 / 1.2).abs() < 1e-9);
        assert!((cuts.output_to_source(out, speed).unwrap() - 1.0).abs() < 1e-9);

        // Inside the second keep: 2.0s kept before + 1.0s in.
        let out = cuts.source_to_output(4.0, speed).unwrap();
        assert!((out - 3.0 / 1.2).abs() < 1e-9);
        assert!((cuts.output_to_source(out, speed).unwrap() - 4.0).abs() < 1e-9);

        // Inside a removed span.
        assert!(cuts.source_to_output(2.5, speed).is_none());

        // Output duration matches the kept material.
        assert!((cuts.kept_duration() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn title_splits_past_four_words() {
        let t = TitleOverlay::from_title("one two three four");
        assert_eq!(t.line1, "one two three four");
        assert!(t.line2.is_none());

        let t = TitleOverlay::from_title("one two three four five");
        assert_eq!(t.line1, "one two three");
        assert_eq!(t.line2.as_deref(), Some("four five"));
    }

    #[test]
    fn crop_interpolation() {
        let windows = vec![
            CropWindow::new(0.0, 0.0, 0.0, 0.5, 1.0),
            CropWindow::new(2.0, 0.2, 0.0, 0.5, 1.0),
        ];
        let mid = interpolate_crop(&windows, 1.0).unwrap();
        assert!((mid.left - 0.1).abs() < 1e-9);
        assert_eq!(mid.width, 0.5);

        // Out-of-range times pin to the nearest keyframe.
        assert_eq!(interpolate_crop(&windows, -1.0).unwrap().left, 0.0);
        assert!((interpolate_crop(&windows, 5.0).unwrap().left - 0.2).abs() < 1e-9);
    }
}
