//! FFmpeg wrapper for the sclip pipeline.
//!
//! This crate provides:
//! - Process lifecycle for ffmpeg with timeout and cancellation
//! - FFprobe-based source inspection
//! - Level-based silence detection
//! - Face tracking behind a pluggable detector backend
//! - Crop trajectory planning
//! - Render plan building with hardware→software encoder fallback

pub mod command;
pub mod crop;
pub mod error;
pub mod filters;
pub mod probe;
pub mod render;
pub mod silence;
pub mod subtitles;
pub mod track;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
pub use crop::{crop_size, plan_crop, CropConfig, TARGET_ASPECT};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use render::{
    build_plan, encode_clip, plan_to_args, EncodeStage, HwAccel, RenderConfig,
};
pub use silence::{detect_silence, SilenceConfig};
pub use subtitles::{remap_for_output, write_sidecar};
pub use track::{
    default_detector, track_faces, FaceBox, FaceDetector, FaceSample, FaceSelector,
    LargestFace, TrackConfig,
};
