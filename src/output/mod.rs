// Output formatting: terminal display of feeds, notifications and threads.

pub mod terminal;

use chrono::{DateTime, Utc};

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like emoji or accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Compact age of a timestamp: "42s", "5m", "3h", "2d", "4mo", "1y".
///
/// A unit is used once strictly more than one of it has elapsed, so exactly
/// one day reads "24h". Future timestamps read "0s".
pub fn time_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);

    const UNITS: [(i64, &str); 5] = [
        (31_536_000, "y"),
        (2_592_000, "mo"),
        (86_400, "d"),
        (3_600, "h"),
        (60, "m"),
    ];

    for (size, suffix) in UNITS {
        if seconds > size {
            return format!("{}{}", seconds / size, suffix);
        }
    }
    format!("{seconds}s")
}

/// `time_since` for an RFC 3339 string; unparseable input is returned as-is.
pub fn time_since_str(timestamp: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(then) => time_since(then.with_timezone(&Utc), now),
        Err(_) => timestamp.to_string(),
    }
}
