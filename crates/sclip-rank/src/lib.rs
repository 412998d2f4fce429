//! Ranking-model clients.
//!
//! The ranking collaborator is a function from transcript text to a list of
//! raw clip proposals. Each supported provider gets its own client behind the
//! [`Ranker`] trait; the provider is chosen once at startup and the client is
//! passed explicitly through the pipeline.

pub mod error;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod parse;
pub mod prompt;

use async_trait::async_trait;

pub use error::{RankError, RankResult};
pub use parse::{parse_clips, RankedClip};

/// A ranking-model client.
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Rank a transcript into raw clip proposals.
    async fn rank(&self, transcript: &str) -> RankResult<Vec<RankedClip>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Supported ranking providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
    Ollama,
}

impl Provider {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Gemini => "gemini-3-flash-preview",
            Self::Ollama => "llama3",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!(
                "unknown provider '{other}' (expected openai, gemini or ollama)"
            )),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construct a client for `provider`, reading credentials from the
/// environment.
pub fn create_ranker(provider: Provider, model: String) -> RankResult<Box<dyn Ranker>> {
    Ok(match provider {
        Provider::OpenAi => Box::new(openai::OpenAiRanker::from_env(model)?),
        Provider::Gemini => Box::new(gemini::GeminiRanker::from_env(model)?),
        Provider::Ollama => Box::new(ollama::OllamaRanker::from_env(model)),
    })
}
