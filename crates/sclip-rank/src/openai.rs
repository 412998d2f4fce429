//! OpenAI chat-completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RankError, RankResult};
use crate::parse::{parse_clips, RankedClip};
use crate::prompt::{user_prompt, SYSTEM_PROMPT};
use crate::Ranker;

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiRanker {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiRanker {
    /// Create a client from `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> RankResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| RankError::MissingApiKey {
            provider: PROVIDER,
            variable: "OPENAI_API_KEY",
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
impl Ranker for OpenAiRanker {
    async fn rank(&self, transcript: &str) -> RankResult<Vec<RankedClip>> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let prompt = user_prompt(transcript);

        debug!(model = %self.model, "requesting clip ranking from OpenAI");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                temperature: 0.3,
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
        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(RankError::EmptyResponse { provider: PROVIDER })?;

        parse_clips(content)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ranker(base: &str) -> OpenAiRanker {
        OpenAiRanker {
            client: Client::new(),
            api_key: "test-key".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: base.to_string(),
        }
    }

    #[tokio::test]
    async fn parses_successful_response() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "{\"clips\":[{\"start_time\":\"00:00:10\",\"end_time\":\"00:00:40\",\"title\":\"Hook\"}]}"
                }
            }]
        });
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let clips = ranker(&server.uri()).rank("transcript").await.unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].title, "Hook");
    }

    #[tokio::test]
    async fn http_error_is_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = ranker(&server.uri()).rank("t").await.unwrap_err();
        assert!(matches!(err, RankError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn empty_content_is_empty_response() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"choices": [{"message": {"content": ""}}]});
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = ranker(&server.uri()).rank("t").await.unwrap_err();
        assert!(matches!(err, RankError::EmptyResponse { .. }));
    }
}
