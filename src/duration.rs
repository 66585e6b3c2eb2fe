//! Human-readable elapsed time.

/// Format whole seconds as `"{h}h {m}m"`. Negative input renders as zero.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// Format whole seconds as `"{h}h {m}m {s}s"`. Negative input renders as zero.
pub fn format_duration_with_seconds(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}h {minutes}m {secs}s")
}
