// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Storage Backend Trait
//!
//! Anti-corruption layer over the physical medium that holds entries. The
//! [`crate::application::StorageManager`] owns all policy (capacity, TTL,
//! atomicity of compound operations); a backend only has to make each single
//! call atomic on its own.
//!
//! | Implementation | Medium |
//! |----------------|--------|
//! | [`crate::infrastructure::memory::InMemoryStorageBackend`] | process-local `HashMap` |
//! | [`crate::infrastructure::postgres::PostgresStorageBackend`] | one PostgreSQL table per store |

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::entry::Entry;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name for logs ("memory", "postgres").
    fn kind(&self) -> &'static str;

    /// Prepare the medium (create tables, check reachability).
    async fn init(&self) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<Entry>, StorageError>;

    async fn get_all(&self) -> Result<HashMap<String, Entry>, StorageError>;

    /// Insert only if `key` is absent. Returns `false`, leaving the stored
    /// entry untouched, if it is already present.
    async fn insert_if_absent(&self, key: &str, entry: &Entry) -> Result<bool, StorageError>;

    /// Insert or overwrite.
    async fn put(&self, key: &str, entry: &Entry) -> Result<(), StorageError>;

    /// Overwrite an existing key. Returns `false` if the key is absent; never inserts.
    async fn update(&self, key: &str, entry: &Entry) -> Result<bool, StorageError>;

    /// Returns `false` if the key was absent.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Returns the number of removed entries.
    async fn remove_all(&self) -> Result<u64, StorageError>;

    /// Remove every entry with `expires_at <= now_ms`; returns how many went.
    async fn cleanup(&self, now_ms: i64) -> Result<u64, StorageError>;

    async fn contains_key(&self, key: &str) -> Result<bool, StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;

    async fn is_maximum(&self, max: u64) -> Result<bool, StorageError> {
        Ok(self.count().await? >= max)
    }

    /// Release connections. Called once by `StorageManager::destroy`.
    async fn close(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("no such key in {store} store: {key}")]
    NotFound { store: String, key: String },

    #[error("key already exists in {store} store: {key}")]
    AlreadyExists { store: String, key: String },

    #[error("maximum of {max} entries reached in {store} store")]
    CapacityExceeded { store: String, max: u64 },

    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("storage configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => StorageError::Configuration(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Serialization(err.to_string())
            }
            _ => StorageError::BackendUnavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
