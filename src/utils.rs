//! Small formatting helpers for logs and progress output.

use std::time::Duration;

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a character
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Render an elapsed time the way progress lines show it.
///
/// - up to a minute: `12.34 seconds`
/// - up to an hour: `3 minutes and 5.00 seconds`
/// - beyond: `2 hours, 0 minutes and 41.50 seconds`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    if total > 3600.0 {
        let hours = (total / 3600.0).floor();
        let rest = total - hours * 3600.0;
        let minutes = (rest / 60.0).floor();
        let seconds = rest - minutes * 60.0;
        format!("{hours:.0} hours, {minutes:.0} minutes and {seconds:.2} seconds")
    } else if total > 60.0 {
        let minutes = (total / 60.0).floor();
        let seconds = total - minutes * 60.0;
        format!("{minutes:.0} minutes and {seconds:.2} seconds")
    } else {
        format!("{total:.2} seconds")
    }
}
