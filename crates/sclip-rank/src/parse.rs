//! Ranking response parsing.
//!
//! Models are told to return bare JSON but routinely wrap it in markdown
//! fences or prose. Parsing strips fences first, then tries the text as-is,
//! then falls back to extracting the outermost JSON object. The clip list may
//! arrive as `{"clips": [...]}` or as a bare array.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RankError, RankResult};

/// One raw clip proposal as the provider returned it.
///
/// Timestamps stay as strings here; validation and conversion happen in the
/// selector, which owns the failure policy for individual proposals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedClip {
    #[serde(alias = "start")]
    pub start_time: String,
    #[serde(alias = "end")]
    pub end_time: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "rationale")]
    pub reason: Option<String>,
    /// Relevance score, when the provider supplies one.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Parse a provider response into raw clips.
pub fn parse_clips(text: &str) -> RankResult<Vec<RankedClip>> {
    let text = strip_fences(text.trim());

    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => {
            // Prose around the payload: pull out the outermost object.
            let re = Regex::new(r"\{[\s\S]*\}").expect("static regex");
            let candidate = re
                .find(&text)
                .ok_or_else(|| {
                    RankError::MalformedResponse("no JSON object in response".to_string())
                })?
                .as_str();
            serde_json::from_str(candidate)
                .map_err(|e| RankError::MalformedResponse(e.to_string()))?
        }
    };

    let clips_value = match &value {
        Value::Object(map) => map
            .get("clips")
            .or_else(|| map.get("highlights"))
            .cloned()
            .ok_or_else(|| {
                RankError::MalformedResponse("response object has no clips field".to_string())
            })?,
        Value::Array(_) => value.clone(),
        _ => {
            return Err(RankError::MalformedResponse(
                "response is neither an object nor an array".to_string(),
            ))
        }
    };

    let clips: Vec<RankedClip> = serde_json::from_value(clips_value)
        .map_err(|e| RankError::MalformedResponse(e.to_string()))?;

    if clips.is_empty() {
        return Err(RankError::MalformedResponse(
            "response contains no clips".to_string(),
        ));
    }
    Ok(clips)
}

/// Remove a surrounding ```/```json fence, if present.
fn strip_fences(text: &str) -> String {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}
