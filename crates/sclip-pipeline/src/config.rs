//! Configuration loading and pipeline settings.
//!
//! Precedence is CLI flag > config file > default. The config file is TOML
//! with `[ai]` and `[output]` sections, searched at an explicit `--config`
//! path, `./config.toml`, then `~/.config/sclip/config.toml`. `.env` and
//! `.env.local` are loaded first without overriding the process environment.

use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;
use tracing::debug;

use sclip_media::{CropConfig, RenderConfig, SilenceConfig, TrackConfig};

use crate::error::{PipelineError, PipelineResult};
use crate::selector::SelectorConfig;

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiSection {
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub remove_silence: bool,
    pub speed: Option<f64>,
}

/// Load `.env` files, never overriding existing environment variables.
pub fn load_dotenv() {
    for name in [".env", ".env.local"] {
        if Path::new(name).exists() {
            let _ = dotenvy::from_filename(name);
        }
    }
}

/// Load the config file.
///
/// A missing file is not an error unless an explicit path was given.
pub fn load_file_config(explicit: Option<&Path>) -> PipelineResult<FileConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(PipelineError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => default_config_paths().into_iter().find(|p| p.exists()),
    };

    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    debug!(path = %path.display(), "loading config file");

    Config::builder()
        .add_source(File::from(path))
        .build()
        .and_then(Config::try_deserialize)
        .map_err(|e| PipelineError::config(e.to_string()))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.toml")];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("sclip")
                .join("config.toml"),
        );
    }
    paths
}

/// Everything the per-clip pipeline needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub remove_silence: bool,
    /// Concurrent clip pipelines.
    pub jobs: usize,
    pub selector: SelectorConfig,
    pub silence: SilenceConfig,
    pub track: TrackConfig,
    pub crop: CropConfig,
    pub render: RenderConfig,
}

impl Settings {
    /// Resolve settings from the config file and CLI overrides.
    pub fn resolve(
        file: &FileConfig,
        output_dir: Option<PathBuf>,
        remove_silence_flag: bool,
        jobs: Option<usize>,
    ) -> Self {
        let default_jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .min(4);

        let mut render = RenderConfig::default();
        if let Some(speed) = file.output.speed {
            render.speed = speed;
        }

        Self {
            output_dir: output_dir
                .or_else(|| file.output.dir.clone())
                .unwrap_or_else(|| PathBuf::from("./shorts_clips")),
            remove_silence: remove_silence_flag || file.output.remove_silence,
            jobs: jobs.unwrap_or(default_jobs).max(1),
            selector: SelectorConfig::default(),
            silence: SilenceConfig::default(),
            track: TrackConfig::default(),
            crop: CropConfig::default(),
            render,
        }
    }
}
