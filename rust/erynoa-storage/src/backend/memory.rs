use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{KeyValueStore, StorageError};

/// A trivial implementation of [KeyValueStore] - backed by a [HashMap] - where
/// all values are kept in memory and never persisted.
///
/// Clones share the same entries.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no keys are held.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
