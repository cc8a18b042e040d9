//! Turns one raw event payload into a [`Record`].
//!
//! Pure and side-effect free: the caller decides what to do with a
//! [`DecodeError`] (the aggregator logs it and keeps the stream going).

use serde_json::Value;

use super::record::{timestamp, Record};
use crate::error::DecodeError;

const REQUIRED: &[&str] = &["name", "url"];
const COLLECTED_AT: &str = "collectedAt";
const LEGACY_COLLECTED_AT: &str = "scrappedAt";

/// Decode a single JSON payload.
///
/// Fails when the payload is not a JSON object, when `name`, `url` or
/// `collectedAt` (alias `scrappedAt`) is missing, or when the timestamp does
/// not parse.
pub fn decode(raw: &str) -> Result<Record, DecodeError> {
    let value: Value = serde_json::from_str(raw.trim())?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::Malformed(serde::de::Error::custom(
            "payload is not a JSON object",
        )));
    };

    for &field in REQUIRED {
        if object.get(field).map_or(true, Value::is_null) {
            return Err(DecodeError::MissingField(field));
        }
    }

    // Providers moving between the two names may send both; the current
    // name wins unless it is null.
    let current = object.remove(COLLECTED_AT).filter(|v| !v.is_null());
    let legacy = object.remove(LEGACY_COLLECTED_AT).filter(|v| !v.is_null());
    let stamp = current
        .or(legacy)
        .ok_or(DecodeError::MissingField(COLLECTED_AT))?;
    if stamp.as_str().and_then(timestamp::parse).is_none() {
        return Err(DecodeError::InvalidTimestamp {
            value: stamp.to_string(),
        });
    }
    object.insert(COLLECTED_AT.to_string(), stamp);

    Ok(serde_json::from_value(Value::Object(object))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn decodes_full_record() {
        let raw = r#"{
            "name": "HackMIT",
            "url": "https://hackmit.org",
            "platform": "MLH",
            "tags": ["ai", "web"],
            "location": "Cambridge, MA",
            "collectedAt": "2024-01-03T10:00:00Z"
        }"#;

        let record = decode(raw).unwrap();
        assert_eq!(record.name, "HackMIT");
        assert_eq!(record.platform.as_deref(), Some("MLH"));
        assert_eq!(record.tags, vec!["ai", "web"]);
        assert_eq!(record.collected_at, Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap());
        assert_eq!(record.extra["location"], "Cambridge, MA");
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(""), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(decode("[1, 2]"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("\"hello\""), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn rejects_missing_fields() {
        let no_name = r#"{"url":"u","collectedAt":"2024-01-03T10:00:00Z"}"#;
        assert!(matches!(decode(no_name), Err(DecodeError::MissingField("name"))));

        let null_url = r#"{"name":"n","url":null,"collectedAt":"2024-01-03T10:00:00Z"}"#;
        assert!(matches!(decode(null_url), Err(DecodeError::MissingField("url"))));

        let no_stamp = r#"{"name":"n","url":"u"}"#;
        assert!(matches!(decode(no_stamp), Err(DecodeError::MissingField("collectedAt"))));
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let raw = r#"{"name":"n","url":"u","collectedAt":"last tuesday"}"#;
        assert!(matches!(decode(raw), Err(DecodeError::InvalidTimestamp { .. })));

        let numeric = r#"{"name":"n","url":"u","collectedAt":1704276000}"#;
        assert!(matches!(decode(numeric), Err(DecodeError::InvalidTimestamp { .. })));
    }

    #[test]
    fn accepts_legacy_field_name() {
        let raw = r#"{"name":"n","url":"u","scrappedAt":"2024-01-01T10:00:00"}"#;
        let record = decode(raw).unwrap();
        assert_eq!(record.collected_at, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn tolerates_odd_display_attributes() {
        let null_tags = r#"{"name":"n","url":"u","tags":null,"collectedAt":"2024-01-03T10:00:00Z"}"#;
        let record = decode(null_tags).unwrap();
        assert!(record.tags.is_empty());

        let numeric_platform = r#"{"name":"n","url":"u","platform":7,"collectedAt":"2024-01-03T10:00:00Z"}"#;
        let record = decode(numeric_platform).unwrap();
        assert_eq!(record.platform.as_deref(), Some("7"));
    }

    #[test]
    fn prefers_collected_at_when_both_names_are_sent() {
        let raw = r#"{"name":"n","url":"u","scrappedAt":"2024-01-01T00:00:00Z","collectedAt":"2024-01-03T10:00:00Z"}"#;
        let record = decode(raw).unwrap();
        assert_eq!(record.collected_at, Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn null_collected_at_falls_back_to_legacy_name() {
        let raw = r#"{"name":"n","url":"u","collectedAt":null,"scrappedAt":"2024-01-02T10:00:00Z"}"#;
        let record = decode(raw).unwrap();
        assert_eq!(record.collected_at, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());

        let both_null = r#"{"name":"n","url":"u","collectedAt":null,"scrappedAt":null}"#;
        assert!(matches!(decode(both_null), Err(DecodeError::MissingField("collectedAt"))));
    }
}
