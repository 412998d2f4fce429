//! Timestamp parsing and formatting.
//!
//! Clip boundaries arrive as `HH:MM:SS`, `MM:SS` or plain seconds, with an
//! optional fractional part. Everything downstream works in `f64` seconds.

use thiserror::Error;

/// Timestamp parsing/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("invalid {component} value '{value}'")]
    InvalidComponent {
        component: &'static str,
        value: String,
    },

    #[error("invalid timestamp format '{0}' (expected HH:MM:SS, MM:SS or SS)")]
    InvalidFormat(String),

    #[error("timestamp cannot be negative")]
    Negative,
}

/// Parse a timestamp string into total seconds.
///
/// Accepts `HH:MM:SS(.mmm)`, `MM:SS(.mmm)` and `SS(.mmm)`.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let components: [&'static str; 3] = ["hours", "minutes", "seconds"];
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    let mut total = 0.0;
    for (offset, part) in parts.iter().enumerate() {
        let component = components[3 - parts.len() + offset];
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidComponent {
                component,
                value: part.to_string(),
            })?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Format seconds as `HH:MM:SS` or `HH:MM:SS.mmm` when a fractional part is
/// present.
pub fn format_seconds(total: f64) -> String {
    let hours = (total / 3600.0).floor() as u32;
    let minutes = ((total % 3600.0) / 60.0).floor() as u32;
    let seconds = total % 60.0;

    if (seconds - seconds.floor()).abs() > 0.0005 {
        format!("{:02}:{:02}:{:06.3}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds.floor() as u32)
    }
}

/// Format seconds for an FFmpeg argument, trimming trailing zeros.
pub fn format_ffmpeg_time(value: f64) -> String {
    let mut s = format!("{:.6}", value);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_formats() {
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert!((parse_timestamp("00:00:30.500").unwrap() - 30.5).abs() < 0.001);
        assert!((parse_timestamp("1:02.5").unwrap() - 62.5).abs() < 0.001);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_timestamp(""), Err(TimestampError::Empty));
        assert_eq!(parse_timestamp("   "), Err(TimestampError::Empty));
        assert!(matches!(
            parse_timestamp("abc"),
            Err(TimestampError::InvalidComponent { .. })
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert_eq!(parse_timestamp("-5"), Err(TimestampError::Negative));
    }

    #[test]
    fn error_names_offending_component() {
        let err = parse_timestamp("aa:30").unwrap_err();
        assert_eq!(
            err,
            TimestampError::InvalidComponent {
                component: "minutes",
                value: "aa".to_string()
            }
        );
    }

    #[test]
    fn formats_round_trip() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(90.0), "00:01:30");
        assert_eq!(format_seconds(3661.0), "01:01:01");
        assert_eq!(format_seconds(30.5), "00:00:30.500");
    }

    #[test]
    fn ffmpeg_time_trims_zeros() {
        assert_eq!(format_ffmpeg_time(1.5), "1.5");
        assert_eq!(format_ffmpeg_time(2.0), "2");
        assert_eq!(format_ffmpeg_time(0.05), "0.05");
    }
}
