#![deny(warnings)]

//! Persistence layer: string-keyed storage backends and the two namespaces
//! the economy writes to.
//!
//! Durable state (fuel, streaks, chance-game dates, refuel count) and session
//! state (ad cadence counter, toast flag) live behind separate handle types so
//! a service cannot write to the wrong one by accident.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

/// Storage keys, shared with any other client of the same device storage.
pub mod keys {
    pub const CALCULATION_FUEL: &str = "calculationFuel";
    pub const DAILY_REWARDS: &str = "dailyRewards";
    pub const LAST_SCRATCH_DATE: &str = "lastScratchDate";
    pub const LAST_SPIN_DATE: &str = "lastSpinDate";
    pub const REFUEL_COUNT: &str = "refuelCount";
    /// Session scoped.
    pub const AD_CALCULATION_COUNT: &str = "adCalculationCount";
    /// Session scoped.
    pub const HAS_SEEN_OUT_OF_FUEL_MESSAGE: &str = "hasSeenOutOfFuelMessage";
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend refused the operation (locked, private mode, quota).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be parsed.
    #[error("malformed value under {key}: {reason}")]
    Malformed { key: String, reason: String },
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

/// String key/value storage with synchronous, per-call atomic writes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type StoreHandle = Arc<dyn KeyValueStore>;

/// In-memory backend. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, as a browser does with session storage on a new tab.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Whole-map JSON file backend.
///
/// Entries are cached in memory; every mutation rewrites the file through a
/// temp file and a rename. A failed write leaves the cached value in place so
/// the session keeps working from memory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable or
    /// corrupt one is logged and also starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable store file, starting empty");
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Storage that outlives the app: fuel, streaks, chance-game dates.
#[derive(Clone)]
pub struct DurableStore(StoreHandle);

/// Storage cleared when the session ends: ad counter, toast flag.
#[derive(Clone)]
pub struct SessionStore(StoreHandle);

impl DurableStore {
    pub fn new(handle: StoreHandle) -> Self {
        Self(handle)
    }

    pub fn memory() -> Self {
        Self(Arc::new(MemoryStore::new()))
    }
}

impl SessionStore {
    pub fn new(handle: StoreHandle) -> Self {
        Self(handle)
    }

    pub fn memory() -> Self {
        Self(Arc::new(MemoryStore::new()))
    }
}

impl Deref for DurableStore {
    type Target = dyn KeyValueStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Deref for SessionStore {
    type Target = dyn KeyValueStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

fn malformed(key: &str, reason: impl ToString) -> StorageError {
    StorageError::Malformed {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Read a stringified non-negative integer.
pub fn load_u32(store: &dyn KeyValueStore, key: &str) -> Result<Option<u32>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| malformed(key, e)),
    }
}

pub fn save_u32(store: &dyn KeyValueStore, key: &str, value: u32) -> Result<(), StorageError> {
    store.set(key, &value.to_string())
}

/// Read a `"true"`/`"false"` flag.
pub fn load_bool(store: &dyn KeyValueStore, key: &str) -> Result<Option<bool>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<bool>()
            .map(Some)
            .map_err(|e| malformed(key, e)),
    }
}

pub fn save_bool(store: &dyn KeyValueStore, key: &str, value: bool) -> Result<(), StorageError> {
    store.set(key, if value { "true" } else { "false" })
}

/// Read an ISO (`YYYY-MM-DD`) calendar date.
pub fn load_date(store: &dyn KeyValueStore, key: &str) -> Result<Option<NaiveDate>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| malformed(key, e)),
    }
}

pub fn save_date(store: &dyn KeyValueStore, key: &str, date: NaiveDate) -> Result<(), StorageError> {
    store.set(key, &date.format("%Y-%m-%d").to_string())
}

pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| malformed(key, e)),
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(value).map_err(|e| malformed(key, e))?;
    store.set(key, &json)
}

/// Returns the default store file used by the CLI.
pub fn default_store_path() -> &'static str {
    "./saves/fuel.json"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clones_share_entries() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set(keys::CALCULATION_FUEL, "7").unwrap();
        assert_eq!(load_u32(&b, keys::CALCULATION_FUEL).unwrap(), Some(7));
        b.clear();
        assert_eq!(a.get(keys::CALCULATION_FUEL).unwrap(), None);
    }

    #[test]
    fn malformed_integer_is_reported() {
        let store = MemoryStore::new();
        store.set(keys::CALCULATION_FUEL, "lots").unwrap();
        let err = load_u32(&store, keys::CALCULATION_FUEL).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { ref key, .. } if key == "calculationFuel"));
        store.set(keys::CALCULATION_FUEL, "-2").unwrap();
        assert!(load_u32(&store, keys::CALCULATION_FUEL).is_err());
    }

    #[test]
    fn dates_are_iso_strings() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        save_date(&store, keys::LAST_SPIN_DATE, d).unwrap();
        assert_eq!(
            store.get(keys::LAST_SPIN_DATE).unwrap().as_deref(),
            Some("2024-03-09")
        );
        assert_eq!(load_date(&store, keys::LAST_SPIN_DATE).unwrap(), Some(d));
    }

    #[test]
    fn namespaces_are_separate() {
        let durable = DurableStore::memory();
        let session = SessionStore::memory();
        save_bool(&*session, keys::HAS_SEEN_OUT_OF_FUEL_MESSAGE, true).unwrap();
        assert_eq!(
            load_bool(&*durable, keys::HAS_SEEN_OUT_OF_FUEL_MESSAGE).unwrap(),
            None
        );
        assert_eq!(
            load_bool(&*session, keys::HAS_SEEN_OUT_OF_FUEL_MESSAGE).unwrap(),
            Some(true)
        );
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        {
            let store = JsonFileStore::open(&path);
            save_u32(&store, keys::REFUEL_COUNT, 2).unwrap();
            save_u32(&store, keys::CALCULATION_FUEL, 11).unwrap();
            store.remove(keys::REFUEL_COUNT).unwrap();
        }
        let store = JsonFileStore::open(&path);
        assert_eq!(load_u32(&store, keys::CALCULATION_FUEL).unwrap(), Some(11));
        assert_eq!(load_u32(&store, keys::REFUEL_COUNT).unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get(keys::CALCULATION_FUEL).unwrap(), None);
        save_u32(&store, keys::CALCULATION_FUEL, 5).unwrap();
        let reopened = JsonFileStore::open(&path);
        assert_eq!(load_u32(&reopened, keys::CALCULATION_FUEL).unwrap(), Some(5));
    }

    #[test]
    fn default_path_is_json() {
        assert!(default_store_path().ends_with(".json"));
    }
}
