// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::hash_map::Entry as Slot;
use std::collections::HashMap;

use crate::domain::entry::Entry;
use crate::domain::storage::{StorageBackend, StorageError};

/// Process-local backend. Every call holds the map lock only for the map
/// operation itself; compound atomicity is the manager's job.
#[derive(Default)]
pub struct InMemoryStorageBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorageBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn get_all(&self) -> Result<HashMap<String, Entry>, StorageError> {
        Ok(self.entries.lock().clone())
    }

    async fn insert_if_absent(&self, key: &str, entry: &Entry) -> Result<bool, StorageError> {
        match self.entries.lock().entry(key.to_string()) {
            Slot::Occupied(_) => Ok(false),
            Slot::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(true)
            }
        }
    }

    async fn put(&self, key: &str, entry: &Entry) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn update(&self, key: &str, entry: &Entry) -> Result<bool, StorageError> {
        match self.entries.lock().get_mut(key) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn remove_all(&self) -> Result<u64, StorageError> {
        let mut entries = self.entries.lock();
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn cleanup(&self, now_ms: i64) -> Result<u64, StorageError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now_ms));
        Ok((before - entries.len()) as u64)
    }

    async fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.lock().contains_key(key))
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.entries.lock().len() as u64)
    }

    async fn close(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::Context;
    use std::time::Duration;

    fn entry(now: i64, ttl_ms: u64) -> Entry {
        Entry::new(Context::new(), now, Duration::from_millis(ttl_ms))
    }

    #[tokio::test]
    async fn test_update_never_inserts() {
        let backend = InMemoryStorageBackend::new();
        assert!(!backend.update("missing", &entry(0, 10)).await.unwrap());
        assert!(!backend.contains_key("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first_entry() {
        let backend = InMemoryStorageBackend::new();
        assert!(backend.insert_if_absent("k", &entry(0, 10)).await.unwrap());
        assert!(!backend.insert_if_absent("k", &entry(5, 10)).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().unwrap().created_at, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let backend = InMemoryStorageBackend::new();
        backend.put("old", &entry(0, 10)).await.unwrap();
        backend.put("edge", &entry(0, 100)).await.unwrap();
        backend.put("new", &entry(0, 1_000)).await.unwrap();

        assert_eq!(backend.cleanup(100).await.unwrap(), 2);
        assert_eq!(backend.count().await.unwrap(), 1);
        assert!(backend.contains_key("new").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_maximum() {
        let backend = InMemoryStorageBackend::new();
        backend.put("a", &entry(0, 10)).await.unwrap();
        assert!(!backend.is_maximum(2).await.unwrap());
        backend.put("b", &entry(0, 10)).await.unwrap();
        assert!(backend.is_maximum(2).await.unwrap());
        assert_eq!(backend.remove_all().await.unwrap(), 2);
        assert!(!backend.remove("a").await.unwrap());
    }
}
