//! Ollama (local model) client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RankError, RankResult};
use crate::parse::{parse_clips, RankedClip};
use crate::prompt::{user_prompt, SYSTEM_PROMPT};
use crate::Ranker;

const PROVIDER: &str = "ollama";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaRanker {
    client: Client,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaRanker {
    /// Create a client; `OLLAMA_HOST` overrides the default local endpoint.
    pub fn from_env(model: impl Into<String>) -> Self {
        let base_url =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            model: model.into(),
            base_url,
        }
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Ranker for OllamaRanker {
    async fn rank(&self, transcript: &str) -> RankResult<Vec<RankedClip>> {
        let url = format!("{}/api/chat", self.base_url);
        let prompt = user_prompt(transcript);

        debug!(model = %self.model, "requesting clip ranking from Ollama");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                stream: false,
                messages: vec![
                    Message {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    Message {
                        role: "user",
                        content: &prompt,
                    },
                ],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RankError::request_failed(
                PROVIDER,
                format!("{status}: {body}"),
            ));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat.message.content.trim();
        if content.is_empty() {
            return Err(RankError::EmptyResponse { provider: PROVIDER });
        }

        parse_clips(content)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
