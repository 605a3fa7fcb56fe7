//! Timestamp formatting and offset helpers.

/// Clamp an offset-adjusted timestamp into `[0, duration]`.
///
/// The offset compensates for reaction time between hearing something and
/// triggering the timestamp command.
pub fn offset_timestamp(current_time: f64, duration: f64, offset: f64) -> f64 {
    (current_time - offset).clamp(0.0, duration)
}

/// Format seconds as a display duration: `M:SS` below an hour,
/// `H:MM:SS` above. Fractional seconds are truncated.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Format seconds for a `#t=` hash in timecode form: `SS.fff`, `M:SS.fff`
/// or `H:MM:SS.fff`, with trailing fraction zeros trimmed.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mut total = seconds.floor() as u64;
    let mut millis = ((seconds - seconds.floor()) * 1000.0).round() as u64;
    if millis >= 1000 {
        total += 1;
        millis = 0;
    }
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    let frac = if millis > 0 {
        format!(".{millis:03}")
            .trim_end_matches('0')
            .to_string()
    } else {
        String::new()
    };
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}{frac}")
    } else if minutes > 0 {
        format!("{minutes}:{secs:02}{frac}")
    } else {
        format!("{secs}{frac}")
    }
}
