//! Per-clip processing and orchestration.
//!
//! Each proposal runs as its own task under a worker-pool semaphore. Within a
//! clip, face tracking and silence detection run concurrently (they read
//! disjoint streams); plan building joins both, then the encode runs as a
//! cancellable subprocess with a single hardware→software retry. One clip's
//! failure never aborts its siblings — the run always ends with a summary.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use sclip_media::track::FaceDetector;
use sclip_media::{
    build_plan, detect_silence, encode_clip, plan_crop, remap_for_output, track_faces,
    write_sidecar, EncodeStage, HwAccel, VideoInfo,
};
use sclip_models::plan::{Overlays, TitleOverlay};
use sclip_models::proposal::{output_basename, ClipProposal};
use sclip_models::transcript::Transcript;

use crate::config::Settings;
use crate::error::PipelineResult;

/// Everything shared by the per-clip tasks. Clip-local state stays inside
/// each task; nothing here is mutated during a run.
pub struct RunContext {
    pub video: PathBuf,
    pub info: VideoInfo,
    /// Subtitle file burned into every clip, if any.
    pub srt_burn: Option<PathBuf>,
    /// Parsed transcript for sidecar generation.
    pub transcript: Option<Arc<Transcript>>,
    pub settings: Settings,
    pub hw: HwAccel,
    /// Face detection backend; `None` degrades every clip to a centered crop.
    pub detector: Option<Arc<dyn FaceDetector>>,
    pub cancel_rx: watch::Receiver<bool>,
}

/// Result of one clip's pipeline.
#[derive(Debug)]
pub struct ClipOutcome {
    pub index: u32,
    pub title: String,
    pub output: PathBuf,
    pub result: Result<(), String>,
    pub size_bytes: u64,
}

impl ClipOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Process all proposals with bounded parallelism.
pub async fn run_clips(ctx: Arc<RunContext>, proposals: Vec<ClipProposal>) -> Vec<ClipOutcome> {
    let semaphore = Arc::new(Semaphore::new(ctx.settings.jobs));
    let total = proposals.len();

    let handles: Vec<_> = proposals
        .into_iter()
        .map(|proposal| {
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return failed_outcome(&ctx, &proposal, "worker pool closed"),
                };
                info!(
                    clip = proposal.index,
                    total,
                    title = %proposal.title,
                    "processing clip"
                );
                process_clip(&ctx, &proposal).await
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| {
            joined.unwrap_or_else(|e| ClipOutcome {
                index: 0,
                title: String::new(),
                output: PathBuf::new(),
                result: Err(format!("clip task panicked: {e}")),
                size_bytes: 0,
            })
        })
        .collect()
}

fn failed_outcome(ctx: &RunContext, proposal: &ClipProposal, message: &str) -> ClipOutcome {
    ClipOutcome {
        index: proposal.index,
        title: proposal.title.clone(),
        output: clip_output_path(ctx, proposal),
        result: Err(message.to_string()),
        size_bytes: 0,
    }
}

fn clip_output_path(ctx: &RunContext, proposal: &ClipProposal) -> PathBuf {
    ctx.settings
        .output_dir
        .join(format!("{}.mp4", output_basename(proposal)))
}

async fn process_clip(ctx: &RunContext, proposal: &ClipProposal) -> ClipOutcome {
    let output = clip_output_path(ctx, proposal);

    let result = render_one(ctx, proposal, &output).await;
    let size_bytes = match &result {
        Ok(()) => tokio::fs::metadata(&output)
            .await
            .map(|m| m.len())
            .unwrap_or(0),
        Err(_) => 0,
    };

    ClipOutcome {
        index: proposal.index,
        title: proposal.title.clone(),
        output,
        result: result.map_err(|e| e.to_string()),
        size_bytes,
    }
}

async fn render_one(
    ctx: &RunContext,
    proposal: &ClipProposal,
    output: &std::path::Path,
) -> PipelineResult<()> {
    let duration = proposal.duration();

    // Face tracking and silence detection read disjoint data; run them
    // concurrently and join before planning.
    let track_task = async {
        let Some(detector) = &ctx.detector else {
            return Vec::new();
        };
        match track_faces(
            Arc::clone(detector),
            &ctx.video,
            proposal.start,
            proposal.end,
            &ctx.settings.track,
        )
        .await
        {
            Ok(samples) => samples,
            Err(e) => {
                warn!(
                    clip = proposal.index,
                    error = %e,
                    "face tracking failed, falling back to centered crop"
                );
                Vec::new()
            }
        }
    };

    let silence_task = async {
        if !ctx.settings.remove_silence {
            return Vec::new();
        }
        match detect_silence(
            &ctx.video,
            proposal.start,
            proposal.end,
            &ctx.settings.silence,
        )
        .await
        {
            Ok(intervals) => intervals,
            Err(e) => {
                warn!(
                    clip = proposal.index,
                    error = %e,
                    "silence detection failed, keeping full clip"
                );
                Vec::new()
            }
        }
    };

    let (samples, silence) = tokio::join!(track_task, silence_task);

    let crop = plan_crop(
        &samples,
        ctx.info.width,
        ctx.info.height,
        duration,
        &ctx.settings.crop,
    );

    let overlays = Overlays {
        title: TitleOverlay::from_title(&proposal.title),
        subtitles: ctx.srt_burn.clone(),
        cta: true,
    };

    let initial_profile = EncodeStage::initial(&ctx.hw).profile(&ctx.hw);
    let (plan, diagnostics) = build_plan(
        proposal,
        crop,
        &silence,
        overlays,
        &ctx.settings.render,
        &ctx.settings.silence,
        initial_profile,
    );
    for diagnostic in &diagnostics {
        warn!(clip = proposal.index, "{diagnostic}");
    }

    encode_clip(
        &plan,
        &ctx.video,
        output,
        &ctx.hw,
        &ctx.settings.render,
        Some(ctx.cancel_rx.clone()),
    )
    .await?;

    // Sidecar subtitles on the output timeline.
    if let Some(transcript) = &ctx.transcript {
        let segments = remap_for_output(transcript, proposal, &plan.cuts, plan.speed);
        if !segments.is_empty() {
            let sidecar = output.with_extension("srt");
            if let Err(e) = write_sidecar(&sidecar, &segments).await {
                warn!(clip = proposal.index, "failed to write sidecar subtitles: {e}");
            }
        }
    }

    info!(
        clip = proposal.index,
        output = %output.display(),
        "clip complete"
    );
    Ok(())
}

/// Print the end-of-run summary.
pub fn print_summary(outcomes: &[ClipOutcome], output_dir: &std::path::Path) {
    println!("\n{}", "=".repeat(50));
    println!("RESULTS:");
    println!("{}", "=".repeat(50));

    for outcome in outcomes {
        match &outcome.result {
            Ok(()) => {
                let mb = outcome.size_bytes as f64 / (1024.0 * 1024.0);
                println!("  + {} ({mb:.1} MB)", outcome.title);
                println!("    -> {}", outcome.output.display());
            }
            Err(e) => {
                println!("  x {}", outcome.title);
                println!("    {e}");
            }
        }
    }

    let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
    println!(
        "\n{succeeded}/{} clips created in {}",
        outcomes.len(),
        output_dir.display()
    );
}
