//! Encoder profiles.
//!
//! A profile is the only part of a render plan that may legitimately differ
//! between the hardware attempt and its software retry.

use serde::{Deserialize, Serialize};

/// Audio codec shared by every profile.
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate shared by every profile.
pub const AUDIO_BITRATE: &str = "128k";

/// Default VAAPI render node.
pub const DEFAULT_VAAPI_DEVICE: &str = "/dev/dri/renderD128";
/// Quantizer for VAAPI encodes.
pub const DEFAULT_VAAPI_QP: u8 = 23;
/// CRF for software encodes.
pub const DEFAULT_SOFTWARE_CRF: u8 = 23;
/// x264 preset for software encodes.
pub const DEFAULT_SOFTWARE_PRESET: &str = "fast";

/// Video encoder parameters for one encode attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderProfile {
    /// VAAPI hardware encoding.
    Vaapi { device: String, qp: u8 },
    /// Software x264 encoding.
    Software { crf: u8, preset: String },
}

impl EncoderProfile {
    pub fn vaapi(device: impl Into<String>) -> Self {
        Self::Vaapi {
            device: device.into(),
            qp: DEFAULT_VAAPI_QP,
        }
    }

    pub fn software() -> Self {
        Self::Software {
            crf: DEFAULT_SOFTWARE_CRF,
            preset: DEFAULT_SOFTWARE_PRESET.to_string(),
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Vaapi { .. })
    }

    /// Arguments inserted before `-i` (hardware device initialization).
    pub fn to_init_args(&self) -> Vec<String> {
        match self {
            Self::Vaapi { device, .. } => vec![
                "-init_hw_device".to_string(),
                format!("vaapi=va:{device}"),
                "-filter_hw_device".to_string(),
                "va".to_string(),
            ],
            Self::Software { .. } => Vec::new(),
        }
    }

    /// Video codec arguments placed after the stream maps.
    pub fn to_codec_args(&self) -> Vec<String> {
        match self {
            Self::Vaapi { qp, .. } => vec![
                "-c:v".to_string(),
                "h264_vaapi".to_string(),
                "-qp".to_string(),
                qp.to_string(),
            ],
            Self::Software { crf, preset } => vec![
                "-c:v".to_string(),
                "libx264".to_string(),
                "-crf".to_string(),
                crf.to_string(),
                "-preset".to_string(),
                preset.clone(),
            ],
        }
    }

    /// Audio and container arguments, identical for every profile.
    pub fn to_common_output_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            AUDIO_CODEC.to_string(),
            "-b:a".to_string(),
            AUDIO_BITRATE.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_args() {
        let args = EncoderProfile::software().to_codec_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-crf".to_string()));
        assert!(EncoderProfile::software().to_init_args().is_empty());
    }

    #[test]
    fn vaapi_args() {
        let profile = EncoderProfile::vaapi(DEFAULT_VAAPI_DEVICE);
        assert!(profile.is_hardware());
        let init = profile.to_init_args();
        assert_eq!(init[1], "vaapi=va:/dev/dri/renderD128");
        let codec = profile.to_codec_args();
        assert!(codec.contains(&"h264_vaapi".to_string()));
        assert!(codec.contains(&"-qp".to_string()));
    }

    #[test]
    fn audio_args_shared() {
        let hw = EncoderProfile::vaapi(DEFAULT_VAAPI_DEVICE).to_common_output_args();
        let sw = EncoderProfile::software().to_common_output_args();
        assert_eq!(hw, sw);
    }
}
