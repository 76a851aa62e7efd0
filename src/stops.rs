//! Saved stops per user
//!
//! Each user has one item: the hash key holding their user id and a `data`
//! attribute holding their saved stops as a JSON string.

use crate::canonical::fingerprint_item;
use crate::error::*;
use crate::table::{Key, KeyKind, Table};
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Attribute holding the JSON-encoded stop list
pub const DATA_ATTRIBUTE: &str = "data";

/// A stop the user has named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedStop {
    pub name: String,
    pub number: u32,
}

impl SavedStop {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedStops {
    #[serde(default)]
    pub stops: Vec<SavedStop>,
}

impl SavedStops {
    pub fn new(stops: Vec<SavedStop>) -> Self {
        Self { stops }
    }

    /// Stop number saved under `name`; the last entry wins on duplicates
    pub fn number_of(&self, name: &str) -> Option<u32> {
        self.stops
            .iter()
            .rev()
            .find(|stop| stop.name == name)
            .map(|stop| stop.number)
    }
}

/// Outcome of resolving a stop name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLookup {
    /// Nothing saved for this user
    NoRecord,
    /// The user has saved stops, none with this name
    Unknown,
    Found(u32),
}

/// Saved-stop storage on top of any [`Table`] with a string hash key
pub struct StopDirectory<T> {
    table: T,
}

impl<T: Table> StopDirectory<T> {
    pub fn new(table: T) -> Result<Self> {
        let hash = &table.schema().hash;
        if hash.kind != KeyKind::String {
            return Err(CodecError::InvalidKey(format!(
                "saved stops need a string hash key, {} is {}",
                hash.name,
                hash.kind.tag()
            )));
        }
        if let Some(range) = &table.schema().range {
            return Err(CodecError::InvalidKey(format!(
                "saved stops need a hash-only table, found range key {}",
                range.name
            )));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Store a user's stops, skipping the write if nothing changed
    pub fn store_stops(&self, user_id: &str, stops: &SavedStops) -> Result<()> {
        let mut item = Item::new();
        item.insert(self.table.schema().hash.name.clone(), user_id.into());
        item.insert(DATA_ATTRIBUTE.to_string(), serde_json::to_string(stops)?.into());

        if let Some(existing) = self.table.get(&Key::hash(user_id))? {
            if fingerprint_item(&existing) == fingerprint_item(&item) {
                debug!(user_id, "saved stops unchanged, skipping write");
                return Ok(());
            }
        }

        info!(user_id, count = stops.stops.len(), table = self.table.name(), "writing saved stops");
        self.table.put(item)
    }

    /// Read a user's stops
    pub fn saved_stops(&self, user_id: &str) -> Result<Option<SavedStops>> {
        debug!(user_id, table = self.table.name(), "reading saved stops");
        let Some(item) = self.table.get(&Key::hash(user_id))? else {
            return Ok(None);
        };

        let data = match item.get(DATA_ATTRIBUTE) {
            Some(AttributeValue::S(data)) => data,
            Some(other) => {
                return Err(CodecError::InvalidValue(format!(
                    "{DATA_ATTRIBUTE} must be S, got {}",
                    other.tag()
                )))
            }
            None => return Err(CodecError::MissingField(DATA_ATTRIBUTE.to_string())),
        };
        Ok(Some(serde_json::from_str(data)?))
    }

    /// Resolve a stop name to its number for a user
    pub fn stop_number(&self, user_id: &str, stop_name: &str) -> Result<StopLookup> {
        let lookup = match self.saved_stops(user_id)? {
            None => StopLookup::NoRecord,
            Some(saved) => saved
                .number_of(stop_name)
                .map_or(StopLookup::Unknown, StopLookup::Found),
        };
        debug!(user_id, stop_name, ?lookup, "stop lookup");
        Ok(lookup)
    }

    /// Drop everything saved for a user; true if there was anything
    pub fn forget(&self, user_id: &str) -> Result<bool> {
        Ok(self.table.delete(&Key::hash(user_id))?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{KeySchema, MemoryTable};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn directory() -> StopDirectory<MemoryTable> {
        StopDirectory::new(MemoryTable::default()).unwrap()
    }

    fn commute() -> SavedStops {
        SavedStops::new(vec![
            SavedStop::new("home", 2068),
            SavedStop::new("work", 765),
            SavedStop::new("gym", 433),
        ])
    }

    #[test]
    fn test_store_and_lookup() {
        let dir = directory();
        dir.store_stops("u1", &commute()).unwrap();

        assert_eq!(dir.stop_number("u1", "work").unwrap(), StopLookup::Found(765));
        assert_eq!(dir.stop_number("u1", "school").unwrap(), StopLookup::Unknown);
        assert_eq!(dir.stop_number("u2", "work").unwrap(), StopLookup::NoRecord);
    }

    #[test]
    fn test_stored_item_layout() {
        let dir = directory();
        dir.store_stops("u1", &SavedStops::new(vec![SavedStop::new("home", 2068)])).unwrap();

        let item = dir.table().get(&Key::hash("u1")).unwrap().unwrap();
        assert_eq!(item.get("userId"), Some(&AttributeValue::S("u1".into())));
        assert_eq!(
            item.get(DATA_ATTRIBUTE),
            Some(&AttributeValue::S(r#"{"stops":[{"name":"home","number":2068}]}"#.into()))
        );
    }

    #[test]
    fn test_reads_rows_written_elsewhere() {
        let dir = directory();
        let mut item = Item::new();
        item.insert("userId".into(), "u1".into());
        item.insert(
            DATA_ATTRIBUTE.into(),
            r#"{"stops":[{"name":"test1","number":2068},{"name":"test2","number":765}]}"#.into(),
        );
        dir.table().put(item).unwrap();

        assert_eq!(dir.stop_number("u1", "test2").unwrap(), StopLookup::Found(765));
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let stops = SavedStops::new(vec![SavedStop::new("home", 1), SavedStop::new("home", 2)]);
        assert_eq!(stops.number_of("home"), Some(2));
    }

    #[test]
    fn test_forget() {
        let dir = directory();
        dir.store_stops("u1", &commute()).unwrap();
        assert!(dir.forget("u1").unwrap());
        assert!(!dir.forget("u1").unwrap());
        assert_eq!(dir.saved_stops("u1").unwrap(), None);
    }

    #[test]
    fn test_malformed_data_attribute() {
        let dir = directory();
        let mut item = Item::new();
        item.insert("userId".into(), "u1".into());
        dir.table().put(item.clone()).unwrap();
        assert!(matches!(dir.saved_stops("u1"), Err(CodecError::MissingField(_))));

        item.insert(DATA_ATTRIBUTE.into(), 5i64.into());
        dir.table().put(item.clone()).unwrap();
        assert!(matches!(dir.saved_stops("u1"), Err(CodecError::InvalidValue(_))));

        item.insert(DATA_ATTRIBUTE.into(), "not json".into());
        dir.table().put(item).unwrap();
        assert!(matches!(dir.saved_stops("u1"), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_requires_string_hash_only_table() {
        let numeric = MemoryTable::new("t", KeySchema::hash_only("id", KeyKind::Number));
        assert!(StopDirectory::new(numeric).is_err());

        let ranged = MemoryTable::new("t", KeySchema::default().with_range("at", KeyKind::Number));
        assert!(StopDirectory::new(ranged).is_err());
    }

    /// Counts puts so unchanged writes can be observed
    struct CountingTable {
        inner: MemoryTable,
        puts: AtomicUsize,
    }

    impl Table for CountingTable {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn schema(&self) -> &KeySchema {
            self.inner.schema()
        }

        fn get(&self, key: &Key) -> Result<Option<Item>> {
            self.inner.get(key)
        }

        fn put(&self, item: Item) -> Result<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(item)
        }

        fn delete(&self, key: &Key) -> Result<Option<Item>> {
            self.inner.delete(key)
        }

        fn query(&self, condition: &crate::table::KeyCondition) -> Result<Vec<Item>> {
            self.inner.query(condition)
        }
    }

    #[test]
    fn test_unchanged_write_is_skipped() {
        let table = Arc::new(CountingTable {
            inner: MemoryTable::default(),
            puts: AtomicUsize::new(0),
        });
        let dir = StopDirectory::new(Arc::clone(&table)).unwrap();

        dir.store_stops("u1", &commute()).unwrap();
        dir.store_stops("u1", &commute()).unwrap();
        assert_eq!(table.puts.load(Ordering::SeqCst), 1);

        dir.store_stops("u1", &SavedStops::default()).unwrap();
        assert_eq!(table.puts.load(Ordering::SeqCst), 2);
        assert_eq!(dir.saved_stops("u1").unwrap(), Some(SavedStops::default()));
    }
}
