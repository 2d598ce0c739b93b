//! Serde helpers shared by the request models.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset (`2024-01-01T12:00:00Z`) and naive local
/// datetimes without one (`2024-01-01T12:00:00.123456`), which are taken as UTC.
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn deserialize_iso8601<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_iso8601(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 datetime: '{raw}'")))
}
