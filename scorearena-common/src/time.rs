//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as RFC 3339 text, as written to the CSV logs
pub fn now_rfc3339() -> String {
    to_rfc3339(now())
}

/// Format a timestamp with millisecond precision and a `Z` suffix
pub fn to_rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_to_rfc3339_uses_utc_suffix() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(to_rfc3339(timestamp), "2024-03-09T14:05:07.000Z");
    }

    #[test]
    fn test_now_rfc3339_parses_back() {
        let text = now_rfc3339();
        let parsed = DateTime::parse_from_rfc3339(&text);
        assert!(parsed.is_ok(), "{} should parse as RFC 3339", text);
    }
}
