//! The listing type shared by every provider.
//!
//! `Record` is what providers emit on their event streams and what the
//! aggregate store writes to disk.  Attributes the engine does not look at
//! are kept in [`Record::extra`] so they survive a store round-trip.
//!
//! ## Ordering
//!
//! The aggregate is kept **newest-first** by [`Record::collected_at`].  Use
//! [`insertion_index`] to find where a new record belongs; records with an
//! equal timestamp keep their arrival order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single discovered listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display name of the hackathon / listing.
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,

    /// Link to the listing on the provider's site.
    #[serde(deserialize_with = "lenient::text")]
    pub url: String,

    /// Platform label (e.g. "MLH", "Devpost").
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform: Option<String>,

    #[serde(default, deserialize_with = "lenient::text_list")]
    pub tags: Vec<String>,

    /// When the provider collected this record.
    ///
    /// Older providers call this field `scrappedAt`; both names are read,
    /// only `collectedAt` is written.
    #[serde(rename = "collectedAt", alias = "scrappedAt", with = "timestamp")]
    pub collected_at: DateTime<Utc>,

    /// Any other attributes the provider sent, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Position at which `record` must be inserted into `records` (sorted
/// newest-first) so the slice stays sorted and equal timestamps keep
/// arrival order: just before the first strictly older element.
pub fn insertion_index(records: &[Record], record: &Record) -> usize {
    records.partition_point(|existing| existing.collected_at >= record.collected_at)
}

/// Display attributes are opaque to the engine, so any JSON shape is
/// accepted: scalars become their text, arrays and objects their compact
/// JSON, and null means absent.
mod lenient {
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    fn render(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        render(Value::deserialize(deserializer)?).ok_or_else(|| de::Error::custom("expected a value, found null"))
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(render(Value::deserialize(deserializer)?))
    }

    /// A list keeps its non-null items; a lone value is a one-item list.
    pub fn text_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().filter_map(render).collect(),
            other => render(other).into_iter().collect(),
        })
    }
}

/// Timestamp parsing shared by the decoder and the serde impls.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Naive layouts some providers emit; interpreted as UTC.
    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// Parse an ISO-8601 timestamp, with or without an offset.
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
