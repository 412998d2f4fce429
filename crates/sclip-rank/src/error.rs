//! Ranking client errors.

use thiserror::Error;

pub type RankResult<T> = Result<T, RankError>;

/// Errors from the ranking collaborator.
///
/// All of these are fatal for an AI-mode run; there is no silent fallback to
/// manual mode.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("{provider} provider requires {variable} to be set")]
    MissingApiKey {
        provider: &'static str,
        variable: &'static str,
    },

    #[error("{provider} request failed: {message}")]
    RequestFailed {
        provider: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    #[error("malformed ranking response: {0}")]
    MalformedResponse(String),
}

impl RankError {
    pub fn request_failed(provider: &'static str, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            provider,
            message: message.into(),
        }
    }
}
