//! Crop planning: face samples in, a smoothed crop keyframe timeline out.
//!
//! The crop is always a fixed-size 9:16 window sized to lose as little of the
//! source frame as possible; only its position moves, so the output never
//! visibly zooms. The raw center trajectory is low-pass filtered with a
//! moving average, then edge-clamped — clamping wins over smoothing at the
//! frame borders.

use tracing::debug;

use sclip_models::CropWindow;

use crate::track::FaceSample;

/// Target aspect ratio (width over height) for vertical output.
pub const TARGET_ASPECT: f64 = 9.0 / 16.0;

/// Crop planner configuration.
#[derive(Debug, Clone)]
pub struct CropConfig {
    /// Moving-average window over the center trajectory, in seconds.
    pub smoothing_window: f64,
    /// Keyframes moving less than this fraction of frame width since the
    /// previous kept keyframe are coalesced away.
    pub min_movement: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 1.0,
            min_movement: 0.005,
        }
    }
}

/// Normalized size of the fixed crop window for a given source resolution.
///
/// Full height with trimmed width when the source is wider than 9:16,
/// full width with trimmed height otherwise — whichever keeps the larger
/// field of view.
pub fn crop_size(source_width: u32, source_height: u32) -> (f64, f64) {
    let source_aspect = source_width as f64 / source_height as f64;
    if source_aspect >= TARGET_ASPECT {
        ((TARGET_ASPECT / source_aspect).min(1.0), 1.0)
    } else {
        (1.0, (source_aspect / TARGET_ASPECT).min(1.0))
    }
}

/// Plan the crop window timeline for one clip.
///
/// `duration` is the clip length in seconds. With no usable samples (empty
/// input or nothing `found`) the plan is a single centered window spanning
/// the whole interval.
pub fn plan_crop(
    samples: &[FaceSample],
    source_width: u32,
    source_height: u32,
    duration: f64,
    config: &CropConfig,
) -> Vec<CropWindow> {
    let (width, height) = crop_size(source_width, source_height);

    let any_found = samples.iter().any(|s| s.found);
    if samples.len() <= 1 || !any_found {
        debug!(
            samples = samples.len(),
            any_found, "no usable trajectory, using centered static crop"
        );
        return vec![centered_window(width, height)];
    }

    // Smooth the raw center trajectory.
    let window_len = smoothing_samples(samples, config.smoothing_window);
    let cx: Vec<f64> = samples.iter().map(|s| s.cx).collect();
    let cy: Vec<f64> = samples.iter().map(|s| s.cy).collect();
    let cx = moving_average(&cx, window_len);
    let cy = moving_average(&cy, window_len);

    // Convert centers to clamped window origins.
    let mut windows: Vec<CropWindow> = samples
        .iter()
        .zip(cx.iter().zip(cy.iter()))
        .map(|(sample, (&cx, &cy))| {
            let left = (cx - width / 2.0).clamp(0.0, 1.0 - width);
            let top = (cy - height / 2.0).clamp(0.0, 1.0 - height);
            CropWindow::new(sample.time, left, top, width, height)
        })
        .collect();

    windows = coalesce(windows, config.min_movement);

    if windows.len() == 1 {
        return windows;
    }

    debug!(keyframes = windows.len(), duration, "crop plan ready");
    windows
}

/// One centered window; the timeline interpolator pins it across the clip.
fn centered_window(width: f64, height: f64) -> CropWindow {
    CropWindow::new(0.0, (1.0 - width) / 2.0, (1.0 - height) / 2.0, width, height)
}

/// Convert the smoothing window from seconds to an odd sample count.
fn smoothing_samples(samples: &[FaceSample], window_secs: f64) -> usize {
    let span = samples.last().map(|s| s.time).unwrap_or(0.0)
        - samples.first().map(|s| s.time).unwrap_or(0.0);
    if span <= 0.0 {
        return 1;
    }
    let rate = samples.len() as f64 / span;
    let mut n = (window_secs * rate).round() as usize;
    n = n.max(1);
    if n % 2 == 0 {
        n += 1;
    }
    n
}

/// Moving average with shrinking windows at the edges.
fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || data.len() < 2 {
        return data.to_vec();
    }
    let pad = window / 2;
    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(pad);
            let end = (i + pad + 1).min(data.len());
            let slice = &data[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Drop keyframes that barely move relative to the last kept one.
fn coalesce(windows: Vec<CropWindow>, min_movement: f64) -> Vec<CropWindow> {
    let Some(&first) = windows.first() else {
        return windows;
    };

    let mut kept: Vec<CropWindow> = vec![first];
    for window in windows.iter().skip(1) {
        let prev = kept.last().unwrap();
        let moved = (window.left - prev.left).abs().max((window.top - prev.top).abs());
        if moved >= min_movement {
            kept.push(*window);
        }
    }

    // A trajectory that never moved is a static crop.
    if kept.len() == 1 {
        return kept;
    }

    // Preserve the endpoint so interpolation covers the tail.
    let last = *windows.last().unwrap();
    if kept.last().unwrap().time < last.time {
        kept.push(last);
    }
    kept
}
