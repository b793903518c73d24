//! Timestamp normalization for stored articles.

use chrono::{DateTime, Duration};

/// Format the site's JSON-LD timestamps are published in.
const SOURCE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
/// Format written to the database.
const DISPLAY_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
/// Shift from the site's reporting clock to the display clock.
const DISPLAY_SHIFT_HOURS: i64 = 7;

/// Reformat an ISO-8601 timestamp with a numeric UTC offset (or a `Z`
/// suffix) as `DD-MM-YYYY HH:MM:SS`, seven hours earlier on the same wall
/// clock.
///
/// Anything that does not parse (sentinels, empty strings, other formats) is
/// returned unchanged, so this never fails.
///
/// ```ignore
/// assert_eq!(normalize_date("2023-05-01T10:00:00+0000"), "01-05-2023 03:00:00");
/// assert_eq!(normalize_date("unknown"), "unknown");
/// ```
pub fn normalize_date(raw: &str) -> String {
    let parsed = DateTime::parse_from_str(raw, SOURCE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw));
    match parsed {
        Ok(parsed) => (parsed - Duration::hours(DISPLAY_SHIFT_HOURS))
            .format(DISPLAY_FORMAT)
            .to_string(),
        Err(_) => raw.to_string(),
    }
}
