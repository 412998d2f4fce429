//! Face tracking.
//!
//! A [`FaceDetector`] produces raw face boxes for frames sampled at a fixed
//! rate; the tracker reduces each frame's boxes to a single presumed-speaker
//! center. Detection cost is proportional to clip duration, not frame count.
//!
//! When no detector backend is available the caller receives
//! `DetectionUnavailable` and degrades to a centered static crop — a warning,
//! never a fatal error.

#[cfg(feature = "opencv")]
pub mod yunet;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// A detected face box in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector confidence in `[0,1]`.
    pub score: f64,
}

impl FaceBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One tracked sample: the presumed speaker's center at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSample {
    /// Clip-local timestamp in seconds.
    pub time: f64,
    /// Normalized center x.
    pub cx: f64,
    /// Normalized center y.
    pub cy: f64,
    /// Confidence of the selected detection (0 when held).
    pub confidence: f64,
    /// Whether a face was actually detected for this sample.
    pub found: bool,
}

/// Detections for one sampled frame.
pub type FrameDetections = Vec<FaceBox>;

/// Face detection backend.
///
/// Implementations are blocking (video decoding and inference); the tracker
/// drives them through `spawn_blocking`.
pub trait FaceDetector: Send + Sync {
    /// Detect faces at `sample_fps` over `[start, end)` of `video`.
    ///
    /// Returns one entry per sampled frame, in time order.
    fn detect_range(
        &self,
        video: &Path,
        start: f64,
        end: f64,
        sample_fps: f64,
    ) -> MediaResult<Vec<FrameDetections>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Strategy for picking the presumed speaker among a frame's detections.
pub trait FaceSelector: Send + Sync {
    fn select<'a>(&self, boxes: &'a [FaceBox], prev_center: (f64, f64)) -> Option<&'a FaceBox>;
}

/// Default strategy: largest face wins; among near-ties, the box closest to
/// the previous sample's center.
pub struct LargestFace {
    /// Boxes within this fraction of the largest area count as ties.
    pub tie_margin: f64,
}

impl Default for LargestFace {
    fn default() -> Self {
        Self { tie_margin: 0.1 }
    }
}

impl FaceSelector for LargestFace {
    fn select<'a>(&self, boxes: &'a [FaceBox], prev_center: (f64, f64)) -> Option<&'a FaceBox> {
        let largest = boxes
            .iter()
            .map(FaceBox::area)
            .fold(f64::NEG_INFINITY, f64::max);
        if largest <= 0.0 {
            return None;
        }

        boxes
            .iter()
            .filter(|b| b.area() >= largest * (1.0 - self.tie_margin))
            .min_by(|a, b| {
                let da = dist_sq(a.center(), prev_center);
                let db = dist_sq(b.center(), prev_center);
                da.total_cmp(&db)
            })
    }
}

fn dist_sq(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Frames per second to sample (2–5 is plenty for one speaker).
    pub sample_fps: f64,
    /// Detections below this score are ignored.
    pub min_confidence: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            sample_fps: 3.0,
            min_confidence: 0.5,
        }
    }
}

/// Reduce per-frame detections to one [`FaceSample`] per sampled frame.
///
/// Samples with no detection hold the last known center rather than jumping
/// back to frame center, so downstream planning degrades to a static crop.
pub fn reduce_detections(
    detections: &[FrameDetections],
    sample_fps: f64,
    min_confidence: f64,
    selector: &dyn FaceSelector,
) -> Vec<FaceSample> {
    let interval = 1.0 / sample_fps;
    let mut last_center = (0.5, 0.5);
    let mut samples = Vec::with_capacity(detections.len());

    for (i, frame) in detections.iter().enumerate() {
        let time = i as f64 * interval;
        let candidates: Vec<FaceBox> = frame
            .iter()
            .copied()
            .filter(|b| b.score >= min_confidence)
            .collect();

        let sample = match selector.select(&candidates, last_center) {
            Some(face) => {
                let (cx, cy) = face.center();
                last_center = (cx, cy);
                FaceSample {
                    time,
                    cx,
                    cy,
                    confidence: face.score,
                    found: true,
                }
            }
            None => FaceSample {
                time,
                cx: last_center.0,
                cy: last_center.1,
                confidence: 0.0,
                found: false,
            },
        };
        samples.push(sample);
    }

    samples
}

/// Track the presumed speaker over `[start, end)` of `video`.
pub async fn track_faces(
    detector: Arc<dyn FaceDetector>,
    video: &Path,
    start: f64,
    end: f64,
    config: &TrackConfig,
) -> MediaResult<Vec<FaceSample>> {
    let video: PathBuf = video.to_path_buf();
    let sample_fps = config.sample_fps;
    let min_confidence = config.min_confidence;

    debug!(
        backend = detector.name(),
        start, end, sample_fps, "tracking faces"
    );

    let detections = tokio::task::spawn_blocking(move || {
        detector.detect_range(&video, start, end, sample_fps)
    })
    .await
    .map_err(|e| MediaError::detection_unavailable(format!("detector task failed: {e}")))??;

    let samples = reduce_detections(
        &detections,
        sample_fps,
        min_confidence,
        &LargestFace::default(),
    );

    debug!(
        samples = samples.len(),
        found = samples.iter().filter(|s| s.found).count(),
        "face tracking complete"
    );

    Ok(samples)
}

/// Construct the default detector backend.
///
/// With the `opencv` feature this resolves the YuNet model; without it, face
/// detection is reported unavailable and callers fall back to a centered
/// crop.
pub fn default_detector() -> MediaResult<Arc<dyn FaceDetector>> {
    #[cfg(feature = "opencv")]
    {
        let detector = yunet::YuNetDetector::new()?;
        return Ok(Arc::new(detector));
    }

    #[cfg(not(feature = "opencv"))]
    Err(MediaError::detection_unavailable(
        "built without the `opencv` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f64, y: f64, w: f64, h: f64, score: f64) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
            score,
        }
    }

    #[test]
    fn largest_face_wins() {
        let boxes = vec![face(0.1, 0.1, 0.1, 0.1, 0.9), face(0.5, 0.5, 0.3, 0.3, 0.8)];
        let selected = LargestFace::default().select(&boxes, (0.0, 0.0)).unwrap();
        assert_eq!(selected.width, 0.3);
    }

    #[test]
    fn near_tie_prefers_previous_center() {
        // Two equal faces; previous center sits on the right one.
        let boxes = vec![face(0.1, 0.4, 0.2, 0.2, 0.9), face(0.7, 0.4, 0.2, 0.2, 0.9)];
        let selected = LargestFace::default().select(&boxes, (0.8, 0.5)).unwrap();
        assert_eq!(selected.x, 0.7);
    }

    #[test]
    fn reduce_holds_last_center_when_lost() {
        let detections = vec![
            vec![face(0.6, 0.2, 0.2, 0.2, 0.9)],
            vec![],
            vec![],
        ];
        let samples = reduce_detections(&detections, 2.0, 0.5, &LargestFace::default());
        assert_eq!(samples.len(), 3);
        assert!(samples[0].found);
        assert!(!samples[1].found);
        // Held, not reset to frame center.
        assert!((samples[1].cx - 0.7).abs() < 1e-9);
        assert!((samples[2].cx - 0.7).abs() < 1e-9);
        assert_eq!(samples[1].confidence, 0.0);
    }

    #[test]
    fn reduce_filters_low_confidence() {
        let detections = vec![vec![face(0.2, 0.2, 0.2, 0.2, 0.3)]];
        let samples = reduce_detections(&detections, 2.0, 0.5, &LargestFace::default());
        assert!(!samples[0].found);
        // Never found: frame center.
        assert!((samples[0].cx - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sample_times_follow_rate() {
        let detections = vec![vec![], vec![], vec![], vec![]];
        let samples = reduce_detections(&detections, 4.0, 0.5, &LargestFace::default());
        assert!((samples[1].time - 0.25).abs() < 1e-9);
        assert!((samples[3].time - 0.75).abs() < 1e-9);
    }
}
