// Timestamp helpers.
//
// The backend emits naive ISO-8601 strings (no offset); locally created
// messages carry RFC 3339 UTC stamps. Both render the same way.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Current time as an RFC 3339 string.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today_date() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn parse(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Short clock time for chat bubbles, e.g. `14:05`. Unparseable input is
/// returned unchanged.
pub fn format_clock(raw: &str) -> String {
    match parse(raw) {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => raw.to_string(),
    }
}

/// Date and time for lists and exports, e.g. `May 01, 2024 10:00`.
pub fn format_date_time(raw: &str) -> String {
    match parse(raw) {
        Some(dt) => dt.format("%b %d, %Y %H:%M").to_string(),
        None => raw.to_string(),
    }
}
