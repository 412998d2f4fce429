//! Google Gemini client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RankError, RankResult};
use crate::parse::{parse_clips, RankedClip};
use crate::prompt::{user_prompt, SYSTEM_PROMPT};
use crate::Ranker;

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiRanker {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiRanker {
    /// Create a client from `GEMINI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> RankResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| RankError::MissingApiKey {
            provider: PROVIDER,
            variable: "GEMINI_API_KEY",
        })?;
        Ok(Self {
            client: Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Ranker for GeminiRanker {
    async fn rank(&self, transcript: &str) -> RankResult<Vec<RankedClip>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!(model = %self.model, "requesting clip ranking from Gemini");

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{SYSTEM_PROMPT}\n\n{}", user_prompt(transcript)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RankError::request_failed(
                PROVIDER,
                format!("{status}: {body}"),
            ));
        }

        let gemini: GeminiResponse = response.json().await?;
        let text = gemini
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .ok_or(RankError::EmptyResponse { provider: PROVIDER })?;

        parse_clips(text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ranker(base: &str) -> GeminiRanker {
        GeminiRanker {
            client: Client::new(),
            api_key: "test-key".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            base_url: base.to_string(),
        }
    }

    #[tokio::test]
    async fn parses_successful_response() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "```json\n{\"clips\":[{\"start_time\":\"00:02:00\",\"end_time\":\"00:02:30\",\"title\":\"Reveal\"}]}\n```"
                    }]
                }
            }]
        });
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*:generateContent$"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let clips = ranker(&server.uri()).rank("transcript").await.unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].title, "Reveal");
    }

    #[tokio::test]
    async fn no_candidates_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let err = ranker(&server.uri()).rank("t").await.unwrap_err();
        assert!(matches!(err, RankError::EmptyResponse { .. }));
    }
}
