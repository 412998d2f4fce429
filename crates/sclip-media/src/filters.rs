//! FFmpeg filter graph construction.
//!
//! The visual pipeline for every clip: the source frame is split into a
//! blurred, vertically-filling background and a sharp foreground slice that
//! follows the planned crop trajectory; title, subtitles and the
//! call-to-action are drawn on the composed 1440×2560 canvas. Timeline
//! handling (silence cuts, speed) is appended after the visual chain.
//!
//! Commands run with `-copyts`, so every time-based expression below works in
//! absolute source seconds.

use std::path::{Path, PathBuf};

use sclip_models::plan::{CropWindow, Overlays};
use sclip_models::timestamp::format_ffmpeg_time;

/// Output canvas size.
pub const CANVAS_WIDTH: u32 = 1440;
pub const CANVAS_HEIGHT: u32 = 2560;

/// Width the foreground is scaled to before slicing.
pub const FG_SCALED_WIDTH: u32 = 2160;

/// Width of the foreground slice on the scaled frame.
pub const FG_SLICE_WIDTH: u32 = 1440;

/// Gaussian blur strength for the background fill.
const BG_BLUR_SIGMA: u32 = 40;

/// Subtitle styling applied via `force_style`.
const SUBTITLE_FORCE_STYLE: &str = concat!(
    "FontName=Arial,",
    "FontSize=12,",
    "Bold=1,",
    "PrimaryColour=&H00FFFFFF,",
    "OutlineColour=&H00000000,",
    "Outline=1,",
    "Shadow=0,",
    "MarginV=62"
);

/// Call-to-action banner text.
const CTA_TEXT: &str = "Watch Full Video Here \u{25BC}";

/// Known font locations, tried after `SCLIP_FONT_FILE`.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/TTF/Arialbd.TTF",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:/Windows/Fonts/arialbd.ttf",
];

/// Escape a path for the `subtitles`/`fontfile` filter arguments.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\\\\\")
        .replace(':', "\\\\:")
        .replace('\'', "\\\\'")
        .replace('[', "\\\\[")
        .replace(']', "\\\\]")
}

/// Escape text for a `drawtext` filter.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\u{2019}")
        .replace(':', "\\:")
        .replace(';', "\\;")
}

/// Resolve a bold display font, preferring `SCLIP_FONT_FILE`.
pub fn resolve_font_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SCLIP_FONT_FILE") {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

fn font_spec(font_file: Option<&Path>) -> String {
    match font_file {
        Some(path) => format!(
            "fontfile={}:",
            escape_filter_path(&path.to_string_lossy())
        ),
        None => "font=Sans:".to_string(),
    }
}

fn subtitle_filter(srt_path: Option<&Path>, fonts_dir: Option<&Path>) -> String {
    let Some(srt) = srt_path else {
        return String::new();
    };

    let mut parts = vec![format!(
        "subtitles={}",
        escape_filter_path(&srt.to_string_lossy())
    )];
    if let Some(dir) = fonts_dir {
        parts.push(format!(
            "fontsdir={}",
            escape_filter_path(&dir.to_string_lossy())
        ));
    }
    parts.push(format!("force_style='{SUBTITLE_FORCE_STYLE}'"));
    parts.join(":") + ","
}

/// Horizontal slice offset expression for the foreground crop.
///
/// Crop keyframe centers are mapped onto the scaled foreground
/// (`cx * 2160 - 720`, clamped so the slice stays on-frame) and joined into a
/// piecewise-linear `if(lt(t,..))` chain over absolute source time. A static
/// plan collapses to a plain integer.
pub fn crop_x_expression(crop: &[CropWindow], clip_start: f64) -> String {
    let max_x = (FG_SCALED_WIDTH - FG_SLICE_WIDTH) as f64;
    let slice_px = |window: &CropWindow| -> f64 {
        let cx = window.left + window.width / 2.0;
        (cx * FG_SCALED_WIDTH as f64 - FG_SLICE_WIDTH as f64 / 2.0).clamp(0.0, max_x)
    };

    match crop {
        [] => (max_x / 2.0).round().to_string(),
        [only] => slice_px(only).round().to_string(),
        _ => {
            // Innermost branch: hold the final position.
            let mut expr = slice_px(crop.last().unwrap()).round().to_string();
            for pair in crop.windows(2).rev() {
                let (a, b) = (&pair[0], &pair[1]);
                let (t0, t1) = (clip_start + a.time, clip_start + b.time);
                let (x0, x1) = (slice_px(a), slice_px(b));
                let span = t1 - t0;
                let segment = if span > 0.0 {
                    format!(
                        "{:.1}+({:.1}-{:.1})*(t-{})/{}",
                        x0,
                        x1,
                        x0,
                        format_ffmpeg_time(t0),
                        format_ffmpeg_time(span)
                    )
                } else {
                    format!("{x1:.1}")
                };
                // The whole expression is single-quoted in the graph, so
                // commas pass through unescaped.
                expr = format!("if(lt(t,{}),{},{})", format_ffmpeg_time(t1), segment, expr);
            }
            // Before the first keyframe, hold its position.
            let first = crop.first().unwrap();
            format!(
                "if(lt(t,{}),{:.1},{})",
                format_ffmpeg_time(clip_start + first.time),
                slice_px(first),
                expr
            )
        }
    }
}

/// Build the visual chain `[0:v] ... [v_visual]`.
pub fn build_visual_filter(
    crop: &[CropWindow],
    clip_start: f64,
    overlays: &Overlays,
    font_file: Option<&Path>,
) -> String {
    let fonts_dir = font_file.and_then(|f| f.parent().map(Path::to_path_buf));
    let subtitles = subtitle_filter(overlays.subtitles.as_deref(), fonts_dir.as_deref());
    let font = font_spec(font_file);
    let crop_x = crop_x_expression(crop, clip_start);

    let title1 = escape_drawtext(&overlays.title.line1);
    let title2_filter = overlays
        .title
        .line2
        .as_deref()
        .map(|line| {
            format!(
                "drawtext=text='{}':{}fontsize=90:fontcolor=white:borderw=10:bordercolor=black:x=(w-text_w)/2:y=310,",
                escape_drawtext(line),
                font
            )
        })
        .unwrap_or_default();

    let cta_filter = if overlays.cta {
        format!(
            "drawtext=text='{}':{}fontsize=30:fontcolor=red:borderw=3:bordercolor=white:alpha='if(lt(mod(t,1),0.5),1,0)':x=(w-text_w)/2-20:y=h-310",
            escape_drawtext(CTA_TEXT),
            font
        )
    } else {
        // Terminal no-op so the chain always ends with a filter.
        "null".to_string()
    };

    format!(
        "[0:v]split=2[bg][fg];\
         [bg]scale=-2:{ch},crop={cw}:{ch}:(iw-{cw})/2:0,gblur=sigma={sigma}[bg_out];\
         [fg]scale={fgw}:-2,crop={slice}:ih:'{crop_x}':0[fg_out];\
         [bg_out][fg_out]overlay=0:(H-h)/2,\
         drawtext=text='{title1}':{font}fontsize=90:fontcolor=white:borderw=10:bordercolor=black:x=(w-text_w)/2:y=200,\
         {title2_filter}\
         {subtitles}\
         {cta_filter}[v_visual]",
        cw = CANVAS_WIDTH,
        ch = CANVAS_HEIGHT,
        sigma = BG_BLUR_SIGMA,
        fgw = FG_SCALED_WIDTH,
        slice = FG_SLICE_WIDTH,
    )
}

/// Append a cut-free timeline: rebase timestamps and apply the speed factor.
///
/// Returns the full filter_complex plus the video and audio map labels.
pub fn build_plain_timeline(
    visual: &str,
    clip_start: f64,
    speed: f64,
) -> (String, String, String) {
    let start = format_ffmpeg_time(clip_start);
    let filter = format!(
        "{visual};\
         [v_visual]setpts=(PTS-{start}/TB)/{speed}[outv];\
         [0:a]asetpts=PTS-{start}/TB,atempo={speed}[outa]"
    );
    (filter, "[outv]".to_string(), "[outa]".to_string())
}

/// Append a cut timeline: trim each kept span, concatenate, then apply speed.
///
/// `keeps` are clip-local; cuts are computed on the original timeline and the
/// speed change happens after concatenation, so silence timestamps stay valid
/// against the un-sped source.
pub fn build_cut_timeline(
    visual: &str,
    keeps: &[(f64, f64)],
    clip_start: f64,
    speed: f64,
) -> (String, String, String) {
    assert!(!keeps.is_empty(), "cut timeline requires kept spans");

    let count = keeps.len();
    let v_sources: Vec<String> = (0..count).map(|i| format!("[v_src{i}]")).collect();
    let a_sources: Vec<String> = (0..count).map(|i| format!("[a_src{i}]")).collect();

    let mut parts = vec![
        visual.to_string(),
        format!("[v_visual]split={count}{}", v_sources.join("")),
        format!("[0:a]asplit={count}{}", a_sources.join("")),
    ];

    let mut concat_inputs = String::new();
    for (i, &(seg_start, seg_end)) in keeps.iter().enumerate() {
        let abs_start = format_ffmpeg_time(clip_start + seg_start);
        let abs_end = format_ffmpeg_time(clip_start + seg_end);
        parts.push(format!(
            "{}trim=start={abs_start}:end={abs_end},setpts=PTS-STARTPTS[v{i}]",
            v_sources[i]
        ));
        parts.push(format!(
            "{}atrim=start={abs_start}:end={abs_end},asetpts=PTS-STARTPTS[a{i}]",
            a_sources[i]
        ));
        concat_inputs.push_str(&format!("[v{i}][a{i}]"));
    }

    parts.push(format!("{concat_inputs}concat=n={count}:v=1:a=1[v_cat][a_cat]"));
    parts.push(format!("[v_cat]setpts=PTS/{speed}[outv]"));
    parts.push(format!("[a_cat]atempo={speed}[outa]"));

    (parts.join(";"), "[outv]".to_string(), "[outa]".to_string())
}

/// Wrap a finished filter graph for a VAAPI encoder: upload the final frames
/// to the hardware surface.
pub fn wrap_hardware(filter_complex: &str, video_map: &str) -> (String, String) {
    (
        format!("{filter_complex};{video_map}format=nv12,hwupload[outv_hw]"),
        "[outv_hw]".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_models::plan::TitleOverlay;

    fn overlays(title: &str) -> Overlays {
        Overlays {
            title: TitleOverlay::from_title(title),
            subtitles: None,
            cta: true,
        }
    }

    #[test]
    fn drawtext_escaping() {
        assert_eq!(escape_drawtext("it's 5:00"), "it\u{2019}s 5\\:00");
        assert_eq!(escape_drawtext("a;b"), "a\\;b");
    }

    #[test]
    fn path_escaping() {
        assert_eq!(escape_filter_path("C:/x"), "C\\\\:/x");
        assert_eq!(escape_filter_path("a'b"), "a\\\\'b");
    }

    #[test]
    fn static_crop_is_a_constant() {
        let crop = vec![CropWindow::new(0.0, 0.25, 0.0, 0.3, 1.0)];
        let expr = crop_x_expression(&crop, 10.0);
        // cx = 0.4 → 0.4*2160 - 720 = 144
        assert_eq!(expr, "144");
    }

    #[test]
    fn empty_crop_centers_the_slice() {
        assert_eq!(crop_x_expression(&[], 0.0), "360");
    }

    #[test]
    fn moving_crop_builds_piecewise_expression() {
        let crop = vec![
            CropWindow::new(0.0, 0.1, 0.0, 0.3, 1.0),
            CropWindow::new(2.0, 0.3, 0.0, 0.3, 1.0),
        ];
        let expr = crop_x_expression(&crop, 5.0);
        assert!(expr.contains("if(lt(t,5)"));
        assert!(expr.contains("if(lt(t,7)"));
        assert!(expr.contains("(t-5)/2"));
    }

    #[test]
    fn slice_offset_clamps_at_edges() {
        let crop = vec![CropWindow::new(0.0, 0.7, 0.0, 0.3, 1.0)];
        // cx = 0.85 → 1116 raw, clamped to 720.
        assert_eq!(crop_x_expression(&crop, 0.0), "720");
    }

    #[test]
    fn visual_filter_contains_composition() {
        let filter = build_visual_filter(&[], 0.0, &overlays("A Big Deal Happened Today"), None);
        assert!(filter.contains("split=2[bg][fg]"));
        assert!(filter.contains("gblur=sigma=40"));
        assert!(filter.contains("y=200"));
        // Five words → two title lines.
        assert!(filter.contains("y=310"));
        assert!(filter.contains("[v_visual]"));
        assert!(filter.contains("font=Sans:"));
    }

    #[test]
    fn visual_filter_without_cta_ends_in_null() {
        let mut o = overlays("short");
        o.cta = false;
        let filter = build_visual_filter(&[], 0.0, &o, None);
        assert!(filter.ends_with("null[v_visual]"));
    }

    #[test]
    fn plain_timeline_rebases_and_speeds() {
        let (filter, vmap, amap) = build_plain_timeline("[0:v]null[v_visual]", 30.0, 1.2);
        assert!(filter.contains("setpts=(PTS-30/TB)/1.2"));
        assert!(filter.contains("atempo=1.2"));
        assert!(!filter.contains("concat"));
        assert_eq!(vmap, "[outv]");
        assert_eq!(amap, "[outa]");
    }

    #[test]
    fn cut_timeline_trims_and_concatenates() {
        let keeps = vec![(0.0, 1.0), (1.5, 3.0)];
        let (filter, _, _) = build_cut_timeline("[0:v]null[v_visual]", &keeps, 10.0, 1.2);
        assert!(filter.contains("[v_visual]split=2"));
        assert!(filter.contains("asplit=2"));
        assert!(filter.contains("trim=start=10:end=11"));
        assert!(filter.contains("trim=start=11.5:end=13"));
        assert!(filter.contains("concat=n=2:v=1:a=1"));
        assert!(filter.contains("[v_cat]setpts=PTS/1.2"));
        assert!(filter.contains("atempo=1.2"));
    }

    #[test]
    fn hardware_wrap_appends_upload() {
        let (filter, vmap) = wrap_hardware("graph[outv]", "[outv]");
        assert!(filter.ends_with("[outv]format=nv12,hwupload[outv_hw]"));
        assert_eq!(vmap, "[outv_hw]");
    }
}
