//! Visitor Key-Value Storage
//!
//! The discount window, A/B variant and consent flag each persist one
//! string value per visitor. In the browser that was local storage; here
//! any store implementing [`KeyValueStore`] will do.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::Result;

/// Simple get/set storage, no transactions
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value (missing keys are fine)
    fn remove(&self, key: &str) -> Result<()>;

    /// Write only if the key is absent; returns whatever is stored afterwards.
    ///
    /// The default is a plain read-then-write. Stores that can do better
    /// should override it so racing writers agree on the first value.
    fn set_if_absent(&self, key: &str, value: &str) -> Result<String> {
        if let Some(existing) = self.get(key)? {
            return Ok(existing);
        }
        self.set(key, value)?;
        Ok(value.to_string())
    }
}

/// In-memory store (tests, single-process deployments)
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the entries `keep` accepts; returns how many were dropped
    pub fn retain(&self, mut keep: impl FnMut(&str, &str) -> bool) -> usize {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let before = values.len();
        values.retain(|key, value| keep(key, value));
        before - values.len()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<String> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        Ok(values
            .entry(key.to_string())
            .or_insert_with(|| value.to_string())
            .clone())
    }
}

/// A view of another store with every key prefixed by a visitor id
pub struct ScopedStore<'a, S: KeyValueStore + ?Sized> {
    inner: &'a S,
    prefix: String,
}

impl<'a, S: KeyValueStore + ?Sized> ScopedStore<'a, S> {
    pub fn new(inner: &'a S, scope: &str) -> Self {
        Self {
            inner,
            prefix: format!("{scope}:"),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for ScopedStore<'_, S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(&self.key(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(&self.key(key), value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(&self.key(key))
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<String> {
        self.inner.set_if_absent(&self.key(key), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));

        store.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_if_absent_first_write_wins() {
        let store = MemoryStore::new();
        assert_eq!(store.set_if_absent("k", "first").unwrap(), "first");
        assert_eq!(store.set_if_absent("k", "second").unwrap(), "first");
    }

    #[test]
    fn test_scoped_stores_are_isolated() {
        let store = MemoryStore::new();
        let alice = ScopedStore::new(&store, "alice");
        let bob = ScopedStore::new(&store, "bob");

        alice.set("countdown_start", "1").unwrap();
        assert_eq!(bob.get("countdown_start").unwrap(), None);
        assert_eq!(store.get("alice:countdown_start").unwrap().as_deref(), Some("1"));
    }
}
