use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Leading labels seen on release pages ("released January 2, 2024").
static RELEASE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(released|release date:?|out)\s+").expect("valid release prefix regex")
});

/// Ordinal day suffixes ("2nd", "21st").
static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%d %B %Y", "%B %d, %Y", "%b %d, %Y"];

const DATETIME_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S GMT", "%Y-%m-%d %H:%M:%S"];

/// Parse a release date as the platform and its feeds print it.
///
/// Returns `None` for anything unrecognized or not a real calendar date
/// (e.g. `2024-02-30`). Timestamps with an offset are converted to UTC
/// before the date is taken.
pub fn parse_release_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    let cleaned = RELEASE_PREFIX.replace(trimmed, "");
    let cleaned = ORDINAL.replace_all(&cleaned, "$1");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
}
