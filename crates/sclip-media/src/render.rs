//! Render plan building and encoding.
//!
//! `build_plan` composes silence cuts, the crop timeline, overlays and the
//! speed factor into one deterministic [`RenderPlan`]; `encode_clip` drives
//! the plan through an explicit hardware→software attempt state machine so
//! the fallback path is testable without ever invoking ffmpeg.

use std::path::Path;

use tokio::sync::watch;
use tracing::{info, warn};

use sclip_models::encoding::DEFAULT_VAAPI_DEVICE;
use sclip_models::plan::{CropWindow, CutList, Overlays, RenderPlan, SilenceInterval};
use sclip_models::proposal::ClipProposal;
use sclip_models::EncoderProfile;

use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};
use crate::filters::{
    build_cut_timeline, build_plain_timeline, build_visual_filter, resolve_font_file,
    wrap_hardware,
};
use crate::silence::SilenceConfig;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Uniform speed factor applied after cuts.
    pub speed: f64,
    /// Upper bound on crop keyframes per clip; longer timelines are
    /// decimated evenly to keep the filter expression bounded.
    pub max_crop_keyframes: usize,
    /// Kill an encode after this many seconds.
    pub encode_timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            speed: 1.2,
            max_crop_keyframes: 24,
            encode_timeout_secs: 600,
        }
    }
}

/// Hardware acceleration probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwAccel {
    Available { device: String },
    Unavailable,
}

impl HwAccel {
    /// Probe for a usable VAAPI render node.
    ///
    /// `SCLIP_DISABLE_VAAPI=1` forces software encoding; otherwise the
    /// default render node must exist and be readable and writable.
    pub fn probe() -> Self {
        let disabled = std::env::var("SCLIP_DISABLE_VAAPI")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if disabled {
            return Self::Unavailable;
        }

        let device = DEFAULT_VAAPI_DEVICE;
        let usable = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .is_ok();
        if usable {
            Self::Available {
                device: device.to_string(),
            }
        } else {
            Self::Unavailable
        }
    }
}

/// Stages of the encode attempt state machine.
///
/// `TryHardware → Success | FallbackSoftware → Success | Fatal`; a run that
/// starts without usable hardware begins directly at `FallbackSoftware`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    TryHardware,
    FallbackSoftware,
}

impl EncodeStage {
    pub fn initial(hw: &HwAccel) -> Self {
        match hw {
            HwAccel::Available { .. } => Self::TryHardware,
            HwAccel::Unavailable => Self::FallbackSoftware,
        }
    }

    pub fn profile(self, hw: &HwAccel) -> EncoderProfile {
        match (self, hw) {
            (Self::TryHardware, HwAccel::Available { device }) => EncoderProfile::vaapi(device),
            _ => EncoderProfile::software(),
        }
    }

    /// The stage to move to after a failed attempt, if any.
    pub fn on_failure(self) -> Option<Self> {
        match self {
            Self::TryHardware => Some(Self::FallbackSoftware),
            Self::FallbackSoftware => None,
        }
    }
}

/// Compose one clip's render plan.
///
/// Cuts are computed on the original timeline; the speed factor is recorded
/// for application after concatenation. If removing the detected silence
/// would keep less than `min_keep_ratio` of the clip the cuts are discarded
/// with a diagnostic, so a misconfigured noise floor can't produce a
/// near-empty short.
pub fn build_plan(
    proposal: &ClipProposal,
    crop: Vec<CropWindow>,
    silence: &[SilenceInterval],
    overlays: Overlays,
    config: &RenderConfig,
    silence_config: &SilenceConfig,
    encoder: EncoderProfile,
) -> (RenderPlan, Vec<String>) {
    let duration = proposal.duration();
    let mut diagnostics = Vec::new();

    let mut cuts = if silence.is_empty() {
        CutList::full(duration)
    } else {
        CutList::from_silence(silence, duration, silence_config.min_keep_segment)
    };

    if !cuts.is_full(duration) {
        let kept_ratio = if duration > 0.0 {
            cuts.kept_duration() / duration
        } else {
            0.0
        };
        if cuts.keeps.is_empty() || kept_ratio < silence_config.min_keep_ratio {
            diagnostics.push(format!(
                "silence removal would keep only {:.0}% of clip {}, skipping",
                kept_ratio * 100.0,
                proposal.index
            ));
            cuts = CutList::full(duration);
        }
    } else {
        // A single full-span keep means nothing to cut.
        cuts = CutList::full(duration);
    }

    let crop = decimate_keyframes(crop, config.max_crop_keyframes);

    let plan = RenderPlan {
        proposal: proposal.clone(),
        cuts,
        crop,
        overlays,
        speed: config.speed,
        encoder,
    };
    (plan, diagnostics)
}

/// Evenly decimate a keyframe timeline to at most `max` entries, always
/// keeping the endpoints.
fn decimate_keyframes(windows: Vec<CropWindow>, max: usize) -> Vec<CropWindow> {
    if windows.len() <= max || max < 2 {
        return windows;
    }
    let last = windows.len() - 1;
    (0..max)
        .map(|i| windows[i * last / (max - 1)])
        .collect()
}

/// Flatten a render plan into ffmpeg arguments.
///
/// Two plans differing only in encoder profile produce argument lists that
/// differ only in hardware init, the `hwupload` tail and codec parameters.
pub fn plan_to_args(
    plan: &RenderPlan,
    video: &Path,
    output: &Path,
    font_file: Option<&Path>,
) -> Vec<String> {
    let start = plan.proposal.start;
    let duration = plan.proposal.duration();

    let visual = build_visual_filter(&plan.crop, start, &plan.overlays, font_file);
    let (filter, video_map, audio_map) = if plan.cuts.is_full(duration) {
        build_plain_timeline(&visual, start, plan.speed)
    } else {
        build_cut_timeline(&visual, &plan.cuts.keeps, start, plan.speed)
    };

    let (filter, video_map) = if plan.encoder.is_hardware() {
        wrap_hardware(&filter, &video_map)
    } else {
        (filter, video_map)
    };

    let mut args = vec!["-y".to_string()];
    args.extend(plan.encoder.to_init_args());
    args.extend([
        "-ss".to_string(),
        format!("{:.3}", start),
        "-to".to_string(),
        format!("{:.3}", plan.proposal.end),
        "-copyts".to_string(),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        video_map,
        "-map".to_string(),
        audio_map,
    ]);
    args.extend(plan.encoder.to_codec_args());
    args.extend(plan.encoder.to_common_output_args());
    args.push(output.to_string_lossy().to_string());
    args
}

/// Encode one clip, retrying once with software parameters after a failed
/// hardware attempt.
///
/// The retry rebuilds the argument list from the same plan with only the
/// encoder profile swapped, and removes any partial output first, so nothing
/// from the failed attempt leaks into the software pass.
pub async fn encode_clip(
    plan: &RenderPlan,
    video: &Path,
    output: &Path,
    hw: &HwAccel,
    config: &RenderConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<()> {
    let font_file = resolve_font_file();
    let mut stage = EncodeStage::initial(hw);

    loop {
        let attempt_plan = RenderPlan {
            encoder: stage.profile(hw),
            ..plan.clone()
        };
        debug_assert!(attempt_plan.semantic_eq(plan));

        let args = plan_to_args(&attempt_plan, video, output, font_file.as_deref());

        let mut runner = FfmpegRunner::new().with_timeout(config.encode_timeout_secs);
        if let Some(rx) = cancel_rx.clone() {
            runner = runner.with_cancel(rx);
        }

        let encoder_kind = if attempt_plan.encoder.is_hardware() {
            "vaapi"
        } else {
            "software"
        };
        info!(clip = plan.proposal.index, encoder = encoder_kind, "encoding clip");

        let result = match runner.run(&args).await {
            Ok(()) => verify_output(output).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => return Ok(()),
            Err(MediaError::Cancelled) => return Err(MediaError::Cancelled),
            Err(e) if e.is_encode_failure() => match stage.on_failure() {
                Some(next) => {
                    warn!(
                        clip = plan.proposal.index,
                        error = %e,
                        "hardware encode failed, retrying with software encoder"
                    );
                    let _ = tokio::fs::remove_file(output).await;
                    stage = next;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

/// An encode that exits zero but writes nothing is still a failure.
async fn verify_output(output: &Path) -> MediaResult<()> {
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(MediaError::EmptyOutput(output.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_models::plan::TitleOverlay;

    fn proposal() -> ClipProposal {
        ClipProposal {
            index: 1,
            start: 30.0,
            end: 50.0,
            title: "test clip".into(),
            rationale: None,
        }
    }

    fn overlays() -> Overlays {
        Overlays {
            title: TitleOverlay::from_title("test clip"),
            subtitles: None,
            cta: true,
        }
    }

    fn hw() -> HwAccel {
        HwAccel::Available {
            device: "/dev/dri/renderD128".to_string(),
        }
    }

    #[test]
    fn stage_machine_transitions() {
        assert_eq!(EncodeStage::initial(&hw()), EncodeStage::TryHardware);
        assert_eq!(
            EncodeStage::initial(&HwAccel::Unavailable),
            EncodeStage::FallbackSoftware
        );
        assert_eq!(
            EncodeStage::TryHardware.on_failure(),
            Some(EncodeStage::FallbackSoftware)
        );
        assert_eq!(EncodeStage::FallbackSoftware.on_failure(), None);
    }

    #[test]
    fn stage_profiles() {
        assert!(EncodeStage::TryHardware.profile(&hw()).is_hardware());
        assert!(!EncodeStage::FallbackSoftware.profile(&hw()).is_hardware());
        // No hardware available: even TryHardware resolves to software.
        assert!(!EncodeStage::TryHardware
            .profile(&HwAccel::Unavailable)
            .is_hardware());
    }

    #[test]
    fn build_plan_without_silence_is_full() {
        let (plan, diags) = build_plan(
            &proposal(),
            vec![],
            &[],
            overlays(),
            &RenderConfig::default(),
            &SilenceConfig::default(),
            EncoderProfile::software(),
        );
        assert!(plan.cuts.is_full(20.0));
        assert!(diags.is_empty());
    }

    #[test]
    fn build_plan_applies_silence_cuts() {
        let silence = vec![SilenceInterval::new(5.0, 8.0)];
        let (plan, diags) = build_plan(
            &proposal(),
            vec![],
            &silence,
            overlays(),
            &RenderConfig::default(),
            &SilenceConfig::default(),
            EncoderProfile::software(),
        );
        assert_eq!(plan.cuts.keeps, vec![(0.0, 5.0), (8.0, 20.0)]);
        assert!(diags.is_empty());
        assert!((plan.output_duration() - 17.0 / 1.2).abs() < 1e-9);
    }

    #[test]
    fn build_plan_guards_against_overcutting() {
        // 19.5 of 20 seconds silent: keep ratio 2.5% < 10%.
        let silence = vec![SilenceInterval::new(0.5, 20.0)];
        let (plan, diags) = build_plan(
            &proposal(),
            vec![],
            &silence,
            overlays(),
            &RenderConfig::default(),
            &SilenceConfig::default(),
            EncoderProfile::software(),
        );
        assert!(plan.cuts.is_full(20.0));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].contains("skipping"));
    }

    #[test]
    fn decimation_keeps_endpoints() {
        let windows: Vec<CropWindow> = (0..100)
            .map(|i| CropWindow::new(i as f64, i as f64 / 200.0, 0.0, 0.3, 1.0))
            .collect();
        let out = decimate_keyframes(windows.clone(), 10);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0], windows[0]);
        assert_eq!(out[9], windows[99]);
    }

    #[test]
    fn fallback_plans_are_semantically_equal() {
        let silence = vec![SilenceInterval::new(5.0, 8.0)];
        let make = |encoder| {
            build_plan(
                &proposal(),
                vec![CropWindow::new(0.0, 0.2, 0.0, 0.3, 1.0)],
                &silence,
                overlays(),
                &RenderConfig::default(),
                &SilenceConfig::default(),
                encoder,
            )
            .0
        };
        let hw_plan = make(EncoderProfile::vaapi("/dev/dri/renderD128"));
        let sw_plan = make(EncoderProfile::software());
        assert!(hw_plan.semantic_eq(&sw_plan));
        assert_ne!(hw_plan.encoder, sw_plan.encoder);
    }

    #[test]
    fn args_differ_only_in_encoder_parameters() {
        let (plan, _) = build_plan(
            &proposal(),
            vec![],
            &[],
            overlays(),
            &RenderConfig::default(),
            &SilenceConfig::default(),
            EncoderProfile::software(),
        );
        let hw_plan = RenderPlan {
            encoder: EncoderProfile::vaapi("/dev/dri/renderD128"),
            ..plan.clone()
        };

        let video = Path::new("in.mp4");
        let output = Path::new("out.mp4");
        let sw_args = plan_to_args(&plan, video, output, None);
        let hw_args = plan_to_args(&hw_plan, video, output, None);

        assert!(sw_args.contains(&"libx264".to_string()));
        assert!(hw_args.contains(&"h264_vaapi".to_string()));
        assert!(hw_args.contains(&"-init_hw_device".to_string()));
        assert!(!sw_args.contains(&"-init_hw_device".to_string()));
        assert!(hw_args.iter().any(|a| a.contains("hwupload")));
        assert!(!sw_args.iter().any(|a| a.contains("hwupload")));

        // Shared structure: seek, copyts, stream maps.
        for args in [&sw_args, &hw_args] {
            assert!(args.contains(&"-copyts".to_string()));
            assert!(args.contains(&"-ss".to_string()));
            assert!(args.contains(&"30.000".to_string()));
            assert!(args.contains(&"-filter_complex".to_string()));
        }
    }

    #[test]
    fn args_use_concat_only_with_cuts() {
        let video = Path::new("in.mp4");
        let output = Path::new("out.mp4");

        let (no_cut_plan, _) = build_plan(
            &proposal(),
            vec![],
            &[],
            overlays(),
            &RenderConfig::default(),
            &SilenceConfig::default(),
            EncoderProfile::software(),
        );
        let args = plan_to_args(&no_cut_plan, video, output, None);
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(!filter.contains("concat"));

        let (cut_plan, _) = build_plan(
            &proposal(),
            vec![],
            &[SilenceInterval::new(5.0, 8.0)],
            overlays(),
            &RenderConfig::default(),
            &SilenceConfig::default(),
            EncoderProfile::software(),
        );
        let args = plan_to_args(&cut_plan, video, output, None);
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("concat=n=2:v=1:a=1"));
    }
}
