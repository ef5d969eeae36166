//! Timestamp formatting for frame labels.

/// Format seconds as `m:ss`.
///
/// Minutes are not padded and keep growing past 59; fractional seconds are
/// truncated.
///
/// # Examples
/// ```
/// use vrev_models::timestamp::format_time;
/// assert_eq!(format_time(125.0), "2:05");
/// assert_eq!(format_time(59.0), "0:59");
/// ```
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}
