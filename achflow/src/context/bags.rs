//! Thread-safe, write-once context bag.

use super::ContextSnapshot;
use crate::errors::DataConflictError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct Entries {
    order: Vec<String>,
    values: HashMap<String, Value>,
}

/// A thread-safe bag for storing context data.
///
/// Keys keep their insertion order. Writing to an existing key raises a
/// `DataConflictError`; there is no overwrite.
#[derive(Debug, Default)]
pub struct ContextBag {
    data: RwLock<Entries>,
}

impl ContextBag {
    /// Creates a new empty context bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value from the bag.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.read().values.get(key).cloned()
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().values.contains_key(key)
    }

    /// Sets a value in the bag.
    ///
    /// # Errors
    ///
    /// Returns `DataConflictError` if the key already exists.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<(), DataConflictError> {
        let key = key.into();
        let mut data = self.data.write();

        if data.values.contains_key(&key) {
            return Err(DataConflictError::new(&key));
        }

        data.order.push(key.clone());
        data.values.insert(key, value);
        Ok(())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().order.len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().order.is_empty()
    }

    /// Returns all keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.read().order.clone()
    }

    /// Captures the current contents.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        let data = self.data.read();
        ContextSnapshot::from_entries(data.order.iter().filter_map(|key| {
            data.values
                .get(key)
                .map(|value| (key.clone(), value.clone()))
        }))
    }
}

impl Clone for ContextBag {
    fn clone(&self) -> Self {
        Self {
            data: RwLock::new(self.data.read().clone()),
        }
    }
}
