//! sclip — vertical shorts from long-form video.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sclip_media::{default_detector, probe_video, HwAccel};
use sclip_models::transcript::Transcript;
use sclip_pipeline::{
    cache, load_dotenv, load_file_config, pipeline, select_manual, select_ranked, transcribe,
    PipelineError, PipelineResult, RunContext, Settings,
};
use sclip_rank::{create_ranker, Provider, RankedClip};

#[derive(Debug, Parser)]
#[command(
    name = "sclip",
    version,
    about = "AI-powered vertical clip generation from long-form video"
)]
#[command(group(ArgGroup::new("mode").args(["openai", "gemini", "ollama", "manual"])))]
struct Cli {
    /// Use the OpenAI ranking provider
    #[arg(short = 'o', long)]
    openai: bool,

    /// Use the Google Gemini ranking provider
    #[arg(short = 'g', long)]
    gemini: bool,

    /// Use a local Ollama model
    #[arg(short = 'l', long)]
    ollama: bool,

    /// Manual mode: START END [TITLE...] — skip ranking and clip directly
    #[arg(short = 'm', long, num_args = 2.., value_names = ["START", "END", "TITLE"])]
    manual: Option<Vec<String>>,

    /// Path to the source video
    video: PathBuf,

    /// Subtitle file (optional in manual mode)
    srt: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Override the ranking model name
    #[arg(long)]
    model: Option<String>,

    /// Path to a config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remove silent moments from clips
    #[arg(long)]
    remove_silence: bool,

    /// Transcribe with the external whisper CLI when no subtitle file exists
    #[arg(long)]
    transcribe: bool,

    /// Concurrent clip pipelines (defaults to CPU count, capped at 4)
    #[arg(long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(any_succeeded) => {
            if !any_succeeded {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sclip=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let file_config = load_file_config(cli.config.as_deref())?;
    let settings = Settings::resolve(
        &file_config,
        cli.output_dir.clone(),
        cli.remove_silence,
        cli.jobs,
    );

    if !cli.video.is_file() {
        return Err(PipelineError::VideoNotFound(cli.video.clone()).into());
    }

    let info = probe_video(&cli.video).await?;
    if info.duration <= 0.0 {
        return Err(PipelineError::Media(sclip_media::MediaError::InvalidVideo(
            "video has no duration".to_string(),
        ))
        .into());
    }
    info!(
        duration = info.duration,
        width = info.width,
        height = info.height,
        "probed source video"
    );

    let srt = transcribe::resolve_srt(&cli.video, cli.srt.as_deref(), cli.transcribe).await?;
    let transcript = match &srt {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading subtitle file {}", path.display()))?;
            Some(Arc::new(Transcript::parse_srt(&content)))
        }
        None => None,
    };

    let proposals = if let Some(manual) = &cli.manual {
        let title = if manual.len() > 2 {
            manual[2..].join(" ")
        } else {
            "clip".to_string()
        };
        let proposal = select_manual(&manual[0], &manual[1], &title, info.duration)
            .map_err(PipelineError::InvalidRange)?;
        info!(
            start = proposal.start,
            end = proposal.end,
            title = %proposal.title,
            "manual mode"
        );
        vec![proposal]
    } else {
        let transcript = transcript.as_ref().ok_or_else(|| {
            PipelineError::transcription_unavailable(
                "AI mode needs a transcript: supply an SRT or pass --transcribe",
            )
        })?;
        let ranked = rank_transcript(&cli, &file_config, transcript).await?;

        let (proposals, diagnostics) =
            select_ranked(transcript, &ranked, info.duration, &settings.selector);
        for diagnostic in &diagnostics {
            warn!("{diagnostic}");
        }
        if proposals.is_empty() {
            return Err(PipelineError::NoValidClips.into());
        }

        println!("Found {} valid clips:", proposals.len());
        for p in &proposals {
            println!(
                "  {}. [{} -> {}] {}",
                p.index,
                sclip_models::format_seconds(p.start),
                sclip_models::format_seconds(p.end),
                p.title
            );
        }
        proposals
    };

    tokio::fs::create_dir_all(&settings.output_dir).await?;

    let detector = match default_detector() {
        Ok(detector) => Some(detector),
        Err(e) => {
            warn!("{e}; clips will use a centered static crop");
            None
        }
    };

    let hw = HwAccel::probe();
    match &hw {
        HwAccel::Available { device } => info!(device, "VAAPI hardware encoding available"),
        HwAccel::Unavailable => info!("VAAPI unavailable, using software encoding"),
    }

    // Ctrl-C flips the cancel signal; in-flight encoders are killed, not
    // orphaned.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight encodes");
            let _ = cancel_tx.send(true);
        }
    });

    let output_dir = settings.output_dir.clone();
    let ctx = Arc::new(RunContext {
        video: cli.video.clone(),
        info,
        srt_burn: srt,
        transcript,
        settings,
        hw,
        detector,
        cancel_rx,
    });

    let outcomes = pipeline::run_clips(ctx, proposals).await;
    pipeline::print_summary(&outcomes, &output_dir);

    Ok(outcomes.iter().any(|o| o.succeeded()))
}

/// Resolve the provider, consult the cuts cache, and rank the transcript.
async fn rank_transcript(
    cli: &Cli,
    file_config: &sclip_pipeline::FileConfig,
    transcript: &Transcript,
) -> PipelineResult<Vec<RankedClip>> {
    let provider = resolve_provider(cli, file_config)?;
    let model = cli
        .model
        .clone()
        .or_else(|| file_config.ai.model.clone())
        .unwrap_or_else(|| provider.default_model().to_string());

    let cache_path = cache::cache_path(&cli.video);
    if let Some(clips) = cache::load_cached_clips(&cache_path) {
        println!("Using cached cuts: {}", cache_path.display());
        return Ok(clips);
    }

    println!("Analyzing transcript with {provider} ({model})...");
    let ranker = create_ranker(provider, model)?;
    let clips = ranker.rank(&transcript.raw).await?;
    cache::save_cached_clips(&cache_path, &clips);
    Ok(clips)
}

fn resolve_provider(
    cli: &Cli,
    file_config: &sclip_pipeline::FileConfig,
) -> PipelineResult<Provider> {
    if cli.openai {
        return Ok(Provider::OpenAi);
    }
    if cli.gemini {
        return Ok(Provider::Gemini);
    }
    if cli.ollama {
        return Ok(Provider::Ollama);
    }
    match &file_config.ai.provider {
        Some(name) => name.parse().map_err(PipelineError::Config),
        None => Err(PipelineError::config(
            "no provider specified: use -o/--openai, -g/--gemini, -l/--ollama, or set [ai].provider in config.toml",
        )),
    }
}
