//! Ranking response cache.
//!
//! Re-running the tool against the same video should not re-bill the ranking
//! provider: the accepted response is cached as `cuts.json` next to the
//! video. The legacy `{"response": "..."}` wrapper (raw provider text) is
//! still readable; new caches store the parsed clips directly.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use sclip_rank::{parse_clips, RankedClip};

const CACHE_FILENAME: &str = "cuts.json";

/// Cache path for a video: `cuts.json` in the video's directory.
pub fn cache_path(video: &Path) -> PathBuf {
    video
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CACHE_FILENAME)
}

/// Load cached clips, tolerating either cache format.
///
/// Any unreadable or unparseable cache is reported and ignored — the caller
/// falls back to the provider.
pub fn load_cached_clips(path: &Path) -> Option<Vec<RankedClip>> {
    if !path.is_file() {
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), "failed to read cuts cache: {e}");
            return None;
        }
    };

    // Legacy format wraps the raw provider text.
    let text = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) if map.get("response").is_some_and(Value::is_string) => map
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => content,
    };

    match parse_clips(&text) {
        Ok(clips) => {
            debug!(path = %path.display(), clips = clips.len(), "using cached cuts");
            Some(clips)
        }
        Err(e) => {
            warn!(path = %path.display(), "invalid cuts cache: {e}");
            None
        }
    }
}

/// Persist clips for the next run. Failure to write is a warning only.
pub fn save_cached_clips(path: &Path, clips: &[RankedClip]) {
    let payload = serde_json::json!({ "clips": clips });
    match serde_json::to_string_pretty(&payload) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!(path = %path.display(), "failed to write cuts cache: {e}");
            } else {
                debug!(path = %path.display(), "saved cuts cache");
            }
        }
        Err(e) => warn!("failed to serialize cuts cache: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips() -> Vec<RankedClip> {
        parse_clips(r#"{"clips":[{"start_time":"00:00:10","end_time":"00:00:40","title":"t"}]}"#)
            .unwrap()
    }

    #[test]
    fn cache_path_is_sibling() {
        assert_eq!(
            cache_path(Path::new("/videos/talk.mp4")),
            PathBuf::from("/videos/cuts.json")
        );
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILENAME);

        save_cached_clips(&path, &clips());
        let loaded = load_cached_clips(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].start_time, "00:00:10");
    }

    #[test]
    fn legacy_response_wrapper_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILENAME);
        let raw = r#"{"clips":[{"start_time":"00:01:00","end_time":"00:01:30","title":"legacy"}]}"#;
        std::fs::write(&path, serde_json::json!({ "response": raw }).to_string()).unwrap();

        let loaded = load_cached_clips(&path).unwrap();
        assert_eq!(loaded[0].title, "legacy");
    }

    #[test]
    fn missing_and_invalid_caches_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILENAME);
        assert!(load_cached_clips(&path).is_none());

        std::fs::write(&path, "not json at all").unwrap();
        assert!(load_cached_clips(&path).is_none());
    }
}
