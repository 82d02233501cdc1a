//! Daily completion tally.
//!
//! One store key maps calendar dates (`YYYY-MM-DD`) to the number of full
//! sessions completed that day. Unreadable data counts as zero.

use crate::store::KeyValueStore;
use crate::Result;
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Store key holding the per-day counts
pub const TALLY_KEY: &str = "tmj-sessions";

/// Reads and bumps the per-day session count
pub struct DailyTally;

impl DailyTally {
    /// Sessions completed on `day`; zero if missing or corrupt
    pub fn count<S: KeyValueStore + ?Sized>(store: &S, day: NaiveDate) -> u32 {
        let counts = Self::load_counts(store);
        counts
            .get(&date_key(day))
            .and_then(parse_count)
            .unwrap_or(0)
    }

    /// Record one more completed session on `day` and return the new count
    pub fn increment<S: KeyValueStore + ?Sized>(store: &mut S, day: NaiveDate) -> Result<u32> {
        let mut counts = Self::load_counts(store);
        let key = date_key(day);
        let next = counts.get(&key).and_then(parse_count).unwrap_or(0) + 1;
        counts.insert(key, Value::from(next));
        store.set(TALLY_KEY, Value::Object(counts))?;
        tracing::info!("Recorded session {} for {}", next, day);
        Ok(next)
    }

    fn load_counts<S: KeyValueStore + ?Sized>(store: &S) -> Map<String, Value> {
        match store.get(TALLY_KEY) {
            Ok(Some(Value::Object(map))) => map,
            Ok(Some(other)) => {
                tracing::warn!("Ignoring malformed session tally: {}", other);
                Map::new()
            }
            Ok(None) => Map::new(),
            Err(e) => {
                tracing::warn!("Failed to read session tally: {}. Counting from zero.", e);
                Map::new()
            }
        }
    }
}

fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn parse_count(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use crate::{Error, KeyValueStore};
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(Error::Store("disk unplugged".into()))
        }

        fn set(&mut self, _key: &str, _value: Value) -> Result<()> {
            Err(Error::Store("disk unplugged".into()))
        }
    }

    #[test]
    fn test_counts_start_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(DailyTally::count(&store, day(18)), 0);
    }

    #[test]
    fn test_increment_twice() {
        let mut store = MemoryStore::new();
        assert_eq!(DailyTally::increment(&mut store, day(18)).unwrap(), 1);
        assert_eq!(DailyTally::increment(&mut store, day(18)).unwrap(), 2);
        assert_eq!(DailyTally::count(&store, day(18)), 2);
    }

    #[test]
    fn test_days_are_independent() {
        let mut store = MemoryStore::new();
        DailyTally::increment(&mut store, day(17)).unwrap();
        DailyTally::increment(&mut store, day(18)).unwrap();
        DailyTally::increment(&mut store, day(18)).unwrap();

        assert_eq!(DailyTally::count(&store, day(17)), 1);
        assert_eq!(DailyTally::count(&store, day(18)), 2);
        assert_eq!(
            store.get(TALLY_KEY).unwrap(),
            Some(json!({"2026-10-17": 1, "2026-10-18": 2}))
        );
    }

    #[test]
    fn test_corrupt_value_counts_as_absent() {
        let mut store = MemoryStore::new();
        store.set(TALLY_KEY, json!("not a map")).unwrap();
        assert_eq!(DailyTally::count(&store, day(18)), 0);
        assert_eq!(DailyTally::increment(&mut store, day(18)).unwrap(), 1);

        store.set(TALLY_KEY, json!({"2026-10-18": "lots"})).unwrap();
        assert_eq!(DailyTally::count(&store, day(18)), 0);
        assert_eq!(DailyTally::increment(&mut store, day(18)).unwrap(), 1);
    }

    #[test]
    fn test_unreadable_store_counts_as_zero() {
        assert_eq!(DailyTally::count(&BrokenStore, day(18)), 0);
        assert!(DailyTally::increment(&mut BrokenStore, day(18)).is_err());
    }

    #[test]
    fn test_corrupt_file_recovers_on_next_completion() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "{{{{ not json").unwrap();

        let mut store = JsonFileStore::new(&path);
        assert_eq!(DailyTally::count(&store, day(18)), 0);
        assert_eq!(DailyTally::increment(&mut store, day(18)).unwrap(), 1);
        assert_eq!(DailyTally::count(&JsonFileStore::new(&path), day(18)), 1);
    }
}
