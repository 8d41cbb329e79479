//! Key-value persistence for sessions, results and reports
//!
//! Values are JSON documents. Lists (actions, results, respondents) are JSON
//! arrays grown with [`KeyValueStore::append`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Result type alias using [`StoreError`]
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend
pub trait KeyValueStore: Send + Sync {
    /// Value at `key`, if any
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Store `value` at `key`, replacing what was there
    fn put(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Push `value` onto the list at `key`, creating it if absent; returns the new length
    fn append(&self, key: &str, value: Value) -> StoreResult<usize>;

    /// Remove `key`; returns whether it existed
    fn delete(&self, key: &str) -> StoreResult<bool>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: Value) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn append(&self, key: &str, value: Value) -> StoreResult<usize> {
        (**self).append(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }
}

/// Typed helpers over any [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        self.put(key, serde_json::to_value(value)?)
    }

    fn append_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<usize> {
        self.append(key, serde_json::to_value(value)?)
    }

    /// Items of the list at `key`; empty when absent
    fn list_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Vec<T>> {
        match self.get(key)? {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(StoreError::from))
                .collect(),
            Some(_) => Err(StoreError::NotAList(key.to_string())),
        }
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// In-process store backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> StoreResult<()> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn append(&self, key: &str, value: Value) -> StoreResult<usize> {
        let mut entries = self.lock();
        let slot = entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => {
                items.push(value);
                Ok(items.len())
            }
            _ => Err(StoreError::NotAList(key.to_string())),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock().remove(key).is_some())
    }
}
