//! Custom serde helpers for query-string and request-body deserialization.
//!
//! Query parameters arrive as strings and the web client is in the habit of
//! sending empty strings for unset filters, so every optional typed filter
//! goes through an empty-tolerant deserializer.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Accepts either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date
/// (interpreted as midnight UTC, matching how date-range filters are sent).
pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => parse_datetime(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("invalid date: {}", s))
}

/// Empty-tolerant deserializer for enum-valued filters (`FromStr`-backed).
pub fn deserialize_optional_from_str<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Accepts a JSON number or a numeric string. The web client sends grade
/// levels and congressional districts both ways.
pub fn deserialize_flexible_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i32),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(n) => Ok(n),
        IntOrString::Str(s) => s.parse::<i32>().map_err(serde::de::Error::custom),
    }
}

/// Optional variant of [`deserialize_flexible_i32`] for partial updates.
pub fn deserialize_optional_flexible_i32<'de, D>(
    deserializer: D,
) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i32),
        Str(String),
    }

    let value: Option<IntOrString> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(IntOrString::Int(n)) => Ok(Some(n)),
        Some(IntOrString::Str(s)) => {
            s.parse::<i32>().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct DateParams {
        #[serde(default, deserialize_with = "deserialize_optional_datetime")]
        start: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_parse_bare_date() {
        let params: DateParams = serde_json::from_str(r#"{"start":"2025-03-15"}"#).unwrap();
        let dt = params.start.unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_parse_rfc3339() {
        let params: DateParams =
            serde_json::from_str(r#"{"start":"2025-03-15T10:30:00Z"}"#).unwrap();
        assert!(params.start.is_some());
    }

    #[test]
    fn test_empty_string_is_none() {
        let params: DateParams = serde_json::from_str(r#"{"start":""}"#).unwrap();
        assert!(params.start.is_none());
    }

    #[derive(Deserialize)]
    struct FlexibleParams {
        #[serde(deserialize_with = "deserialize_flexible_i32")]
        value: i32,
    }

    #[test]
    fn test_flexible_i32_from_number() {
        let params: FlexibleParams = serde_json::from_str(r#"{"value":7}"#).unwrap();
        assert_eq!(params.value, 7);
    }

    #[test]
    fn test_flexible_i32_from_string() {
        let params: FlexibleParams = serde_json::from_str(r#"{"value":"7"}"#).unwrap();
        assert_eq!(params.value, 7);
    }

    #[test]
    fn test_flexible_i32_rejects_garbage() {
        let result: Result<FlexibleParams, _> = serde_json::from_str(r#"{"value":"seven"}"#);
        assert!(result.is_err());
    }
}
