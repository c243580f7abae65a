//! Persisted per-community collapse state.
//!
//! State lives in a small key-value store under keys of the shape
//! `collapsed:<community>` with values `"1"` (collapsed) or `"0"`
//! (expanded). Entries are written on every toggle and never deleted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

/// Key prefix for collapse flags
const COLLAPSED_PREFIX: &str = "collapsed:";

const COLLAPSED: &str = "1";
const EXPANDED: &str = "0";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory store, used when no state file is available.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key-value store persisted as a JSON object, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// or corrupt file is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt state file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read state file");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "State store opened");

        Self { path, entries }
    }

    fn persist(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, contents).map_err(io_err)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }
}

/// Read access to collapse flags, used by renderers.
pub trait CollapseLookup {
    fn is_collapsed(&self, community: &str) -> bool;
}

/// Collapse flags for community groups on top of a key-value store.
#[derive(Debug)]
pub struct CollapseState<S> {
    store: S,
}

impl<S: KeyValueStore> CollapseState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn key(community: &str) -> String {
        format!("{}{}", COLLAPSED_PREFIX, community)
    }

    pub fn set_collapsed(&mut self, community: &str, collapsed: bool) -> Result<(), StorageError> {
        let value = if collapsed { COLLAPSED } else { EXPANDED };
        self.store.set(&Self::key(community), value)
    }

    /// Flip the flag for a group and persist it. Returns the new state.
    pub fn toggle(&mut self, community: &str) -> Result<bool, StorageError> {
        let collapsed = !self.is_collapsed(community);
        self.set_collapsed(community, collapsed)?;
        Ok(collapsed)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> CollapseLookup for CollapseState<S> {
    /// Groups without a stored flag are expanded
    fn is_collapsed(&self, community: &str) -> bool {
        self.store.get(&Self::key(community)).as_deref() == Some(COLLAPSED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_expanded() {
        let state = CollapseState::new(MemoryStore::new());
        assert!(!state.is_collapsed("Oakwood"));
    }

    #[test]
    fn test_toggle_writes_flag() {
        let mut state = CollapseState::new(MemoryStore::new());
        assert!(state.toggle("Oakwood").unwrap());
        assert_eq!(state.store().get("collapsed:Oakwood").as_deref(), Some("1"));
        assert!(state.is_collapsed("Oakwood"));

        assert!(!state.toggle("Oakwood").unwrap());
        assert_eq!(state.store().get("collapsed:Oakwood").as_deref(), Some("0"));
        assert!(!state.is_collapsed("Oakwood"));
    }

    #[test]
    fn test_unknown_value_reads_as_expanded() {
        let mut store = MemoryStore::new();
        store.set("collapsed:Oakwood", "yes").unwrap();
        let state = CollapseState::new(store);
        assert!(!state.is_collapsed("Oakwood"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("collapse.json");

        let mut state = CollapseState::new(JsonFileStore::open(&path));
        state.set_collapsed("Birch Hollow", true).unwrap();
        state.set_collapsed("Oakwood", false).unwrap();

        let reopened = CollapseState::new(JsonFileStore::open(&path));
        assert!(reopened.is_collapsed("Birch Hollow"));
        assert!(!reopened.is_collapsed("Oakwood"));
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collapse.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("collapsed:Oakwood"), None);
    }
}
