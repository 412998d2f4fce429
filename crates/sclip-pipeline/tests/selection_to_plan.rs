//! End-to-end flow without ffmpeg: ranking response → selection → render
//! plan → argument list, checking the pipeline-level invariants.

use std::path::Path;

use sclip_media::{build_plan, plan_to_args, remap_for_output, RenderConfig, SilenceConfig};
use sclip_models::plan::{Overlays, SilenceInterval, TitleOverlay};
use sclip_models::transcript::Transcript;
use sclip_models::EncoderProfile;
use sclip_pipeline::{select_ranked, SelectorConfig};
use sclip_rank::parse_clips;

fn transcript() -> Transcript {
    Transcript::parse_srt(
        "1\n00:00:12,000 --> 00:00:18,000\nthe big reveal\n\n\
         2\n00:00:20,000 --> 00:00:28,000\nand what it means\n\n\
         3\n00:02:05,000 --> 00:02:15,000\nunrelated tangent\n\n",
    )
}

fn ranking_response() -> &'static str {
    r#"{"clips":[
        {"start_time":"00:00:10","end_time":"00:00:30","title":"The Reveal","reason":"hook"},
        {"start_time":"00:02:00","end_time":"00:03:10","title":"Long Tangent"},
        {"start_time":"00:04:00","end_time":"00:04:10","title":"Too Short"}
    ]}"#
}

#[test]
fn ranked_response_to_plans() {
    let ranked = parse_clips(ranking_response()).unwrap();
    let (proposals, diagnostics) =
        select_ranked(&transcript(), &ranked, 600.0, &SelectorConfig::default());

    // 20s kept, 70s clamped to 60s, 10s dropped.
    assert_eq!(proposals.len(), 2);
    assert_eq!(diagnostics.len(), 1);
    assert!((proposals[0].duration() - 20.0).abs() < 1e-9);
    assert!((proposals[1].duration() - 60.0).abs() < 1e-9);

    // The first proposal's rationale comes from the overlapping captions.
    let rationale = proposals[0].rationale.as_deref().unwrap();
    assert!(rationale.contains("the big reveal"));

    // Build hardware and software plans for the first proposal with a
    // silence interval; plan semantics must be identical.
    let silence = vec![SilenceInterval::new(4.0, 6.0)];
    let overlays = || Overlays {
        title: TitleOverlay::from_title(&proposals[0].title),
        subtitles: None,
        cta: true,
    };

    let (hw_plan, _) = build_plan(
        &proposals[0],
        vec![],
        &silence,
        overlays(),
        &RenderConfig::default(),
        &SilenceConfig::default(),
        EncoderProfile::vaapi("/dev/dri/renderD128"),
    );
    let (sw_plan, _) = build_plan(
        &proposals[0],
        vec![],
        &silence,
        overlays(),
        &RenderConfig::default(),
        &SilenceConfig::default(),
        EncoderProfile::software(),
    );
    assert!(hw_plan.semantic_eq(&sw_plan));

    // The cut survives into the argument list as a trim/concat graph.
    let args = plan_to_args(&sw_plan, Path::new("in.mp4"), Path::new("out.mp4"), None);
    let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
    assert!(filter.contains("concat=n=2:v=1:a=1"));
    assert!(filter.contains("atempo=1.2"));

    // Sidecar captions land on the sped, cut output timeline.
    let segments = remap_for_output(&transcript(), &proposals[0], &sw_plan.cuts, sw_plan.speed);
    assert!(!segments.is_empty());
    // First caption: source 12s → local 2s → output 2/1.2s.
    assert!((segments[0].start - 2.0 / 1.2).abs() < 1e-6);
    // Nothing maps past the output duration.
    let out_duration = sw_plan.output_duration();
    assert!(segments.iter().all(|s| s.end <= out_duration + 1e-6));
}

#[test]
fn selection_is_deterministic_across_runs() {
    let ranked = parse_clips(ranking_response()).unwrap();
    let a = select_ranked(&transcript(), &ranked, 600.0, &SelectorConfig::default());
    let b = select_ranked(&transcript(), &ranked, 600.0, &SelectorConfig::default());
    assert_eq!(a.0, b.0);
}
