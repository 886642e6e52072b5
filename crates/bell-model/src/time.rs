//! Timestamps on the wire and relative-time display
//!
//! The backend emits `createdAt` either as an RFC 3339 string, as a zone-less
//! ISO local date-time, or as epoch milliseconds. Zone-less values are taken
//! as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
}

/// Parse a textual timestamp in any accepted form
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, LOCAL_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {text}"))),
        RawTimestamp::Millis(millis) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {millis}"))),
    }
}

pub(crate) fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

/// Render how long ago `at` was, relative to `now`
///
/// Future timestamps (clock skew) render as "just now".
#[must_use]
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mins = (now - at).num_minutes();
    if mins < 1 {
        return "just now".to_string();
    }
    if mins < 60 {
        return plural(mins, "minute");
    }
    let hours = mins / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }
    plural(hours / 24, "day")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let at = parse_timestamp("2025-01-31T19:00:00+07:00").unwrap();
        assert_eq!(at, base());
    }

    #[test]
    fn parses_local_datetime_as_utc() {
        assert_eq!(parse_timestamp("2025-01-31T12:00:00").unwrap(), base());
        assert_eq!(parse_timestamp("2025-01-31T12:00:00.000123").unwrap().timestamp(), base().timestamp());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn relative_time_buckets() {
        let now = base();
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - Duration::seconds(59), now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(relative_time(now - Duration::minutes(59), now), "59 minutes ago");
        assert_eq!(relative_time(now - Duration::minutes(60), now), "1 hour ago");
        assert_eq!(relative_time(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(relative_time(now - Duration::hours(24), now), "1 day ago");
        assert_eq!(relative_time(now - Duration::days(9), now), "9 days ago");
    }

    #[test]
    fn future_is_just_now() {
        let now = base();
        assert_eq!(relative_time(now + Duration::minutes(5), now), "just now");
    }
}
