//! Persistent aggregate store.
//!
//! A single durable slot holding the last-known aggregate as a JSON array of
//! records, newest first.  It is read once at startup and rewritten after
//! every insertion.  The in-memory aggregate is always authoritative; the
//! aggregator logs store failures and carries on.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::PersistenceError;
use crate::source::Record;

/// A durable slot for the merged result list.
pub trait AggregateStore: Send {
    /// Load the stored aggregate.  An absent slot is an empty aggregate.
    fn load(&self) -> Result<Vec<Record>, PersistenceError>;

    /// Replace the stored aggregate with `records`.
    fn save(&mut self, records: &[Record]) -> Result<(), PersistenceError>;
}

/// Stores the aggregate as a JSON file at a fixed path.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AggregateStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Record>, PersistenceError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no stored aggregate, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<Record> = serde_json::from_str(&json)?;
        info!(path = %self.path.display(), count = records.len(), "loaded stored aggregate");
        Ok(records)
    }

    fn save(&mut self, records: &[Record]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(records)?;

        // Write beside the slot, then rename over it, so a crash mid-write
        // never leaves a truncated aggregate behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), count = records.len(), "saved aggregate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{Map, Value};

    fn make_record(name: &str, day: u32) -> Record {
        Record {
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            platform: Some("MLH".to_string()),
            tags: vec!["web".to_string()],
            collected_at: Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap(),
            extra: Map::new(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("hackhub-events.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_preserves_content_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("hackhub-events.json"));

        let mut with_extra = make_record("c", 1);
        with_extra.extra.insert("location".into(), Value::from("Online"));
        // Deliberately not sorted: the store must not reorder.
        let records = vec![make_record("a", 3), with_extra, make_record("b", 2)];

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);
    }

    #[test]
    fn save_overwrites_previous_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("hackhub-events.json"));

        store.save(&[make_record("old", 1)]).unwrap();
        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
        assert!(!dir.path().join("hackhub-events.json.tmp").exists());
    }

    #[test]
    fn corrupt_slot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hackhub-events.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(PersistenceError::Serde(_))));
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("missing-dir").join("slot.json"));
        assert!(matches!(store.save(&[make_record("a", 1)]), Err(PersistenceError::Io(_))));
    }
}
