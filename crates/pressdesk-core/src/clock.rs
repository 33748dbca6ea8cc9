// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp formatting shared by every persisted record.
//!
//! All timestamps are ISO-8601 UTC strings with millisecond precision, which
//! sort lexicographically in time order.

use chrono::{DateTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats a UTC instant in the persisted timestamp format.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(FORMAT).to_string()
}

/// The current instant in the persisted timestamp format.
pub fn now() -> String {
    format_timestamp(Utc::now())
}

/// Parses a persisted timestamp. Accepts any RFC 3339 string as well.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn format_and_parse_agree() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();
        let s = format_timestamp(at);
        assert_eq!(s, "2026-03-01T12:30:05.000Z");
        assert_eq!(parse_timestamp(&s), Some(at));
    }

    #[test]
    fn garbage_does_not_parse() {
        assert_eq!(parse_timestamp("tomorrow"), None);
    }
}
