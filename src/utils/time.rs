/// Render a playback position as `M:SS`. Negative input counts as zero.
pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
