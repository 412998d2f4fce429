//! Sidecar subtitle generation.
//!
//! Burned-in subtitles ride the source timeline (the encode runs with
//! `-copyts`), but the sidecar `.srt` shipped next to each clip must match
//! the final output: clip-local, with removed silence collapsed and the
//! speed factor applied. Remapping goes through the cut list, so a segment
//! spanning a removed span is split around it.

use std::path::Path;

use sclip_models::plan::CutList;
use sclip_models::proposal::ClipProposal;
use sclip_models::transcript::{write_srt, Transcript, TranscriptSegment};

use crate::error::MediaResult;

/// Captions shorter than this on the output timeline are dropped.
const MIN_CAPTION_SECS: f64 = 0.1;

/// Remap transcript segments into a clip's output timeline.
pub fn remap_for_output(
    transcript: &Transcript,
    proposal: &ClipProposal,
    cuts: &CutList,
    speed: f64,
) -> Vec<TranscriptSegment> {
    let mut out = Vec::new();

    for segment in transcript.segments_in_range(proposal.start, proposal.end) {
        // Clip-local source times.
        let local_start = (segment.start - proposal.start).max(0.0);
        let local_end = (segment.end - proposal.start).min(proposal.duration());

        // Intersect with every kept span; each intersection becomes one
        // output caption.
        for &(keep_start, keep_end) in &cuts.keeps {
            let s = local_start.max(keep_start);
            let e = local_end.min(keep_end);
            if e <= s {
                continue;
            }

            let (Some(out_start), Some(out_end)) = (
                cuts.source_to_output(s, speed),
                cuts.source_to_output(e, speed),
            ) else {
                continue;
            };

            if out_end - out_start >= MIN_CAPTION_SECS {
                out.push(TranscriptSegment {
                    start: out_start,
                    end: out_end,
                    text: segment.text.clone(),
                });
            }
        }
    }

    out
}

/// Write a sidecar SRT file for one clip.
pub async fn write_sidecar(
    path: &Path,
    segments: &[TranscriptSegment],
) -> MediaResult<()> {
    tokio::fs::write(path, write_srt(segments)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcript {
        Transcript::parse_srt(
            "1\n00:00:32,000 --> 00:00:34,000\nfirst\n\n\
             2\n00:00:35,000 --> 00:00:37,000\nsecond\n\n\
             3\n00:00:48,000 --> 00:00:52,000\nthird\n\n",
        )
    }

    fn proposal() -> ClipProposal {
        ClipProposal {
            index: 1,
            start: 30.0,
            end: 50.0,
            title: "t".into(),
            rationale: None,
        }
    }

    #[test]
    fn remap_without_cuts_rebases_and_speeds() {
        let cuts = CutList::full(20.0);
        let segments = remap_for_output(&transcript(), &proposal(), &cuts, 2.0);
        assert_eq!(segments.len(), 3);
        // 32s source → 2s local → 1s output at 2×.
        assert!((segments[0].start - 1.0).abs() < 1e-9);
        assert!((segments[0].end - 2.0).abs() < 1e-9);
        // Third segment is clipped to the proposal end (50s → local 20).
        assert!((segments[2].end - 10.0).abs() < 1e-9);
    }

    #[test]
    fn remap_collapses_removed_spans() {
        // Remove local [3,5): "second" (local 5..7) slides left by 2s.
        let cuts = CutList {
            keeps: vec![(0.0, 3.0), (5.0, 20.0)],
        };
        let segments = remap_for_output(&transcript(), &proposal(), &cuts, 1.0);
        let second = segments.iter().find(|s| s.text == "second").unwrap();
        assert!((second.start - 3.0).abs() < 1e-9);
        assert!((second.end - 5.0).abs() < 1e-9);
    }

    #[test]
    fn remap_splits_segments_across_cuts() {
        // "third" spans local 18..20; cut local [18.5,19.5).
        let cuts = CutList {
            keeps: vec![(0.0, 18.5), (19.5, 20.0)],
        };
        let segments = remap_for_output(&transcript(), &proposal(), &cuts, 1.0);
        let thirds: Vec<_> = segments.iter().filter(|s| s.text == "third").collect();
        assert_eq!(thirds.len(), 2);
        // Second half starts right where the first ends on the output
        // timeline.
        assert!((thirds[0].end - thirds[1].start).abs() < 1e-9);
    }

    #[test]
    fn remap_drops_fully_cut_captions() {
        // "first" (local 2..4) falls entirely inside the removed span.
        let cuts = CutList {
            keeps: vec![(0.0, 1.0), (4.5, 20.0)],
        };
        let segments = remap_for_output(&transcript(), &proposal(), &cuts, 1.0);
        assert!(segments.iter().all(|s| s.text != "first"));
    }
}
