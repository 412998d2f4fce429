//! Shared data models for the sclip pipeline.
//!
//! This crate provides the types that flow between the selector, the media
//! layer and the orchestrator:
//! - Timestamp parsing and formatting
//! - Transcript segments and SRT handling
//! - Clip proposals
//! - Render plans (crop timeline, cut list, overlays, encoder profile)

pub mod encoding;
pub mod plan;
pub mod proposal;
pub mod timestamp;
pub mod transcript;

pub use encoding::{EncoderProfile, AUDIO_BITRATE, AUDIO_CODEC};
pub use plan::{
    merge_silence_intervals, CropWindow, CutList, Overlays, RenderPlan, SilenceInterval,
    TitleOverlay,
};
pub use proposal::{output_basename, sanitize_title, ClipProposal};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
pub use transcript::{Transcript, TranscriptSegment};
