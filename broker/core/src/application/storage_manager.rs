// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Storage Manager
//!
//! Capacity- and TTL-bounded key/value store on top of a [`StorageBackend`].
//!
//! ## Invariants
//!
//! - At most one live entry per key. [`StorageManager::create`] checks and inserts
//!   under the same write lock, so of N concurrent creators of one key exactly one
//!   wins.
//! - The entry count never exceeds `max`. Any insert that would grow the store past
//!   it fails with [`StorageError::CapacityExceeded`]; nothing is evicted to make room.
//! - Reads never extend an entry's lifetime. Only the sweep removes expired entries,
//!   so a read between sweeps may still see a logically expired entry.
//!
//! All compound operations run under one coarse `tokio::sync::RwLock` per store,
//! held across the backend round-trip. Reads share it; writes and the sweep take
//! it exclusively.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::storage_factory::create_storage_backend;
use crate::application::sweeper::Sweeper;
use crate::domain::clock::Clock;
use crate::domain::config::StoreConfig;
use crate::domain::context::Context;
use crate::domain::entry::{ttl_millis, Entry};
use crate::domain::storage::{StorageBackend, StorageError};

/// State shared between the manager and its sweep task.
pub(crate) struct StoreShared {
    pub(crate) name: String,
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    lock: RwLock<()>,
}

impl StoreShared {
    pub(crate) async fn sweep(&self) -> Result<u64, StorageError> {
        let _guard = self.lock.write().await;
        let now = self.clock.now_millis();
        let removed = self.backend.cleanup(now).await?;
        if removed > 0 {
            metrics::counter!("ssobroker_store_swept_total", "store" => self.name.clone()).increment(removed);
        }
        let remaining = self.backend.count().await?;
        metrics::gauge!("ssobroker_store_entries", "store" => self.name.clone()).set(remaining as f64);
        Ok(removed)
    }
}

struct SweeperHandle {
    shutdown_token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct StorageManager {
    shared: Arc<StoreShared>,
    max: Option<u64>,
    ttl: Duration,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl StorageManager {
    /// Build the configured backend, prepare it and start the sweep task if an
    /// interval is configured. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Configuration`] - invalid limits or missing backend parameters
    /// - [`StorageError::BackendUnavailable`] - the backend could not be reached
    pub async fn init(
        name: impl Into<String>,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let name = name.into();
        config
            .validate(&name)
            .map_err(|e| StorageError::Configuration(e.to_string()))?;

        let backend = create_storage_backend(&config.backend).await.map_err(|e| {
            error!(store = %name, error = %e, "Failed to create storage backend");
            e
        })?;

        Self::with_backend(name, config, backend, clock).await
    }

    /// Same as [`StorageManager::init`] with an already constructed backend.
    ///
    /// # Errors
    ///
    /// [`StorageError::Configuration`] for a zero TTL or sweep interval.
    pub async fn with_backend(
        name: impl Into<String>,
        config: &StoreConfig,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let name = name.into();
        config
            .validate(&name)
            .map_err(|e| StorageError::Configuration(e.to_string()))?;
        backend.init().await.map_err(|e| {
            error!(store = %name, backend = backend.kind(), error = %e, "Failed to initialise storage backend");
            e
        })?;

        info!(
            store = %name,
            backend = backend.kind(),
            max = ?config.max,
            ttl_ms = ttl_millis(config.expire),
            interval = ?config.interval,
            "Storage manager initialised"
        );

        let manager = Self {
            shared: Arc::new(StoreShared {
                name,
                backend,
                clock,
                lock: RwLock::new(()),
            }),
            max: config.max,
            ttl: config.expire,
            sweeper: Mutex::new(None),
        };

        if let Some(interval) = config.interval {
            manager.start_sweeper(interval);
        }

        Ok(manager)
    }

    fn start_sweeper(&self, interval: Duration) {
        let sweeper = Sweeper::new(self.shared.clone(), interval);
        let shutdown_token = sweeper.shutdown_token();
        let handle = sweeper.start();
        *self.sweeper.lock() = Some(SweeperHandle { shutdown_token, handle });
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn max(&self) -> Option<u64> {
        self.max
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert only if `key` is not present. Returns `false` if it already exists.
    ///
    /// # Errors
    ///
    /// [`StorageError::CapacityExceeded`] if the store is full.
    pub async fn create(&self, key: &str, context: Context) -> Result<bool, StorageError> {
        match self.insert(key, context).await {
            Ok(()) => Ok(true),
            Err(StorageError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Strict form of [`StorageManager::create`].
    ///
    /// # Errors
    ///
    /// - [`StorageError::AlreadyExists`] if `key` is present
    /// - [`StorageError::CapacityExceeded`] if the store is full
    pub async fn insert(&self, key: &str, context: Context) -> Result<(), StorageError> {
        let result: Result<(), StorageError> = async {
            let _guard = self.shared.lock.write().await;
            if self.shared.backend.contains_key(key).await? {
                return Err(StorageError::AlreadyExists {
                    store: self.shared.name.clone(),
                    key: key.to_string(),
                });
            }
            self.ensure_capacity().await?;
            let entry = Entry::new(context, self.shared.clock.now_millis(), self.ttl);
            if self.shared.backend.insert_if_absent(key, &entry).await? {
                Ok(())
            } else {
                Err(StorageError::AlreadyExists {
                    store: self.shared.name.clone(),
                    key: key.to_string(),
                })
            }
        }
        .await;
        self.logged("insert", key, result)
    }

    /// Put back an entry previously removed with [`StorageManager::take`],
    /// timestamps included. Returns `false` if `key` has been reused meanwhile.
    ///
    /// # Errors
    ///
    /// [`StorageError::CapacityExceeded`] if the store filled up meanwhile.
    pub async fn restore(&self, key: &str, entry: Entry) -> Result<bool, StorageError> {
        let result: Result<bool, StorageError> = async {
            let _guard = self.shared.lock.write().await;
            if self.shared.backend.contains_key(key).await? {
                return Ok(false);
            }
            self.ensure_capacity().await?;
            self.shared.backend.insert_if_absent(key, &entry).await
        }
        .await;
        self.logged("restore", key, result)
    }

    /// Insert or overwrite. Overwriting restarts the entry's lifetime.
    ///
    /// # Errors
    ///
    /// [`StorageError::CapacityExceeded`] if `key` is new and the store is full.
    pub async fn put(&self, key: &str, context: Context) -> Result<(), StorageError> {
        let result: Result<(), StorageError> = async {
            let _guard = self.shared.lock.write().await;
            if !self.shared.backend.contains_key(key).await? {
                self.ensure_capacity().await?;
            }
            let entry = Entry::new(context, self.shared.clock.now_millis(), self.ttl);
            self.shared.backend.put(key, &entry).await
        }
        .await;
        self.logged("put", key, result)
    }

    /// Replace the context of an existing entry. Timestamps are left untouched.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if `key` is absent; the key is not created.
    pub async fn update(&self, key: &str, context: Context) -> Result<(), StorageError> {
        let result: Result<(), StorageError> = async {
            let _guard = self.shared.lock.write().await;
            let existing = self.shared.backend.get(key).await?.ok_or_else(|| self.not_found(key))?;
            if self.shared.backend.update(key, &existing.with_context(context)).await? {
                Ok(())
            } else {
                Err(self.not_found(key))
            }
        }
        .await;
        self.logged("update", key, result)
    }

    /// Push the expiry of an existing entry to now + TTL, keeping its creation
    /// time. Returns the new expiry.
    pub async fn refresh_expiration(&self, key: &str) -> Result<i64, StorageError> {
        let result: Result<i64, StorageError> = async {
            let _guard = self.shared.lock.write().await;
            let mut entry = self.shared.backend.get(key).await?.ok_or_else(|| self.not_found(key))?;
            entry.expires_at = self.shared.clock.now_millis().saturating_add(ttl_millis(self.ttl));
            if self.shared.backend.update(key, &entry).await? {
                Ok(entry.expires_at)
            } else {
                Err(self.not_found(key))
            }
        }
        .await;
        self.logged("refresh_expiration", key, result)
    }

    pub async fn get(&self, key: &str) -> Result<Context, StorageError> {
        self.get_entry(key).await.map(|entry| entry.context)
    }

    pub async fn get_entry(&self, key: &str) -> Result<Entry, StorageError> {
        let result: Result<Entry, StorageError> = async {
            let _guard = self.shared.lock.read().await;
            self.shared.backend.get(key).await?.ok_or_else(|| self.not_found(key))
        }
        .await;
        self.logged("get", key, result)
    }

    pub async fn get_timestamp(&self, key: &str) -> Result<i64, StorageError> {
        self.get_entry(key).await.map(|entry| entry.created_at)
    }

    pub async fn get_expiration_time(&self, key: &str) -> Result<i64, StorageError> {
        self.get_entry(key).await.map(|entry| entry.expires_at)
    }

    /// Consistent snapshot of every entry.
    pub async fn get_all(&self) -> Result<HashMap<String, Entry>, StorageError> {
        let result = {
            let _guard = self.shared.lock.read().await;
            self.shared.backend.get_all().await
        };
        self.logged("get_all", "*", result)
    }

    pub async fn get_count(&self) -> Result<u64, StorageError> {
        let result = self.shared.backend.count().await;
        self.logged("get_count", "*", result)
    }

    pub async fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        let result = {
            let _guard = self.shared.lock.read().await;
            self.shared.backend.contains_key(key).await
        };
        self.logged("contains_key", key, result)
    }

    /// Remove `key`. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let result = {
            let _guard = self.shared.lock.write().await;
            self.shared.backend.remove(key).await
        };
        match self.logged("remove", key, result)? {
            true => Ok(()),
            false => {
                debug!(store = %self.shared.name, key = %key, "Remove of absent key ignored");
                Ok(())
            }
        }
    }

    /// Remove `key` and return the entry it held. Of several concurrent callers
    /// for one key, exactly one receives the entry.
    pub async fn take(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        let result: Result<Option<Entry>, StorageError> = async {
            let _guard = self.shared.lock.write().await;
            let Some(entry) = self.shared.backend.get(key).await? else {
                return Ok(None);
            };
            if self.shared.backend.remove(key).await? {
                Ok(Some(entry))
            } else {
                Ok(None)
            }
        }
        .await;
        self.logged("take", key, result)
    }

    pub async fn remove_all(&self) -> Result<u64, StorageError> {
        let result = {
            let _guard = self.shared.lock.write().await;
            self.shared.backend.remove_all().await
        };
        let removed = self.logged("remove_all", "*", result)?;
        info!(store = %self.shared.name, removed, "Removed all entries");
        Ok(removed)
    }

    /// Run one sweep immediately, outside the background schedule.
    pub async fn sweep_now(&self) -> Result<u64, StorageError> {
        let result = self.shared.sweep().await;
        self.logged("sweep", "*", result)
    }

    /// Stop the sweep task and release the backend.
    pub async fn destroy(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(SweeperHandle { shutdown_token, handle }) = sweeper {
            shutdown_token.cancel();
            if let Err(e) = handle.await {
                warn!(store = %self.shared.name, error = %e, "Sweep task ended abnormally");
            }
        }
        self.shared.backend.close().await;
        info!(store = %self.shared.name, "Storage manager destroyed");
    }

    async fn ensure_capacity(&self) -> Result<(), StorageError> {
        if let Some(max) = self.max {
            if self.shared.backend.is_maximum(max).await? {
                return Err(StorageError::CapacityExceeded {
                    store: self.shared.name.clone(),
                    max,
                });
            }
        }
        Ok(())
    }

    fn not_found(&self, key: &str) -> StorageError {
        StorageError::NotFound {
            store: self.shared.name.clone(),
            key: key.to_string(),
        }
    }

    fn logged<T>(&self, operation: &'static str, key: &str, result: Result<T, StorageError>) -> Result<T, StorageError> {
        if let Err(e) = &result {
            match e {
                StorageError::NotFound { .. } | StorageError::AlreadyExists { .. } => {
                    debug!(store = %self.shared.name, operation, key = %key, "{}", e);
                }
                StorageError::CapacityExceeded { .. } => {
                    warn!(store = %self.shared.name, operation, key = %key, "{}", e);
                }
                _ => {
                    error!(store = %self.shared.name, operation, key = %key, error = %e, "Storage operation failed");
                }
            }
        }
        result
    }
}

impl Drop for StorageManager {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.shutdown_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::infrastructure::memory::InMemoryStorageBackend;

    async fn manager(max: Option<u64>, clock: Arc<ManualClock>) -> StorageManager {
        let config = StoreConfig {
            max,
            ..StoreConfig::in_memory(Duration::from_secs(60))
        };
        StorageManager::with_backend("test", &config, Arc::new(InMemoryStorageBackend::new()), clock)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_refuses_existing_key() {
        let store = manager(None, Arc::new(ManualClock::new(0))).await;
        assert!(store.create("k", Context::new().with("n", "1")).await.unwrap());
        assert!(!store.create("k", Context::new().with("n", "2")).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().get_str("n"), Some("1"));
    }

    #[tokio::test]
    async fn test_insert_reports_existing_key() {
        let store = manager(Some(1), Arc::new(ManualClock::new(0))).await;
        store.insert("k", Context::new()).await.unwrap();
        assert!(matches!(
            store.insert("k", Context::new()).await,
            Err(StorageError::AlreadyExists { .. })
        ));
        // Existing key is reported before capacity.
        assert!(!store.create("k", Context::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrite_allowed_at_capacity() {
        let store = manager(Some(1), Arc::new(ManualClock::new(0))).await;
        store.put("a", Context::new()).await.unwrap();
        store.put("a", Context::new().with("v", "2")).await.unwrap();
        assert!(matches!(
            store.put("b", Context::new()).await,
            Err(StorageError::CapacityExceeded { max: 1, .. })
        ));
        assert_eq!(store.get_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_existence() {
        let store = manager(None, Arc::new(ManualClock::new(0))).await;
        let err = store.update("ghost", Context::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert!(!store.contains_key("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_preserves_timestamps() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = manager(None, clock.clone()).await;
        store.create("k", Context::new()).await.unwrap();

        clock.advance(Duration::from_secs(10));
        store.update("k", Context::new().with("uid", "alice")).await.unwrap();

        let entry = store.get_entry("k").await.unwrap();
        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.expires_at, 61_000);
        assert_eq!(entry.context.get_str("uid"), Some("alice"));
    }

    #[tokio::test]
    async fn test_refresh_expiration_keeps_creation_time() {
        let clock = Arc::new(ManualClock::new(0));
        let store = manager(None, clock.clone()).await;
        store.create("k", Context::new()).await.unwrap();

        clock.advance(Duration::from_secs(30));
        let expiry = store.refresh_expiration("k").await.unwrap();

        assert_eq!(expiry, 90_000);
        assert_eq!(store.get_timestamp("k").await.unwrap(), 0);
        assert_eq!(store.get_expiration_time("k").await.unwrap(), 90_000);
    }

    #[tokio::test]
    async fn test_read_does_not_extend_or_filter() {
        let clock = Arc::new(ManualClock::new(0));
        let store = manager(None, clock.clone()).await;
        store.create("k", Context::new()).await.unwrap();

        clock.advance(Duration::from_secs(120));
        // Logically expired but not yet swept.
        assert!(store.get("k").await.is_ok());
        assert_eq!(store.get_expiration_time("k").await.unwrap(), 60_000);

        assert_eq!(store.sweep_now().await.unwrap(), 1);
        assert!(matches!(store.get("k").await, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_zero_intervals_rejected() {
        for config in [
            StoreConfig {
                interval: Some(Duration::ZERO),
                ..StoreConfig::in_memory(Duration::from_secs(60))
            },
            StoreConfig::in_memory(Duration::ZERO),
        ] {
            let result = StorageManager::with_backend(
                "test",
                &config,
                Arc::new(InMemoryStorageBackend::new()),
                Arc::new(ManualClock::new(0)),
            )
            .await;
            assert!(matches!(result, Err(StorageError::Configuration(_))));
        }
    }

    #[tokio::test]
    async fn test_take_hands_out_entry_once() {
        let store = Arc::new(manager(None, Arc::new(ManualClock::new(0))).await);
        store.create("k", Context::new().with("n", "1")).await.unwrap();

        let (a, b) = tokio::join!(store.take("k"), store.take("k"));
        let winners: Vec<Entry> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].context.get_str("n"), Some("1"));
        assert!(!store.contains_key("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_keeps_timestamps() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = manager(Some(1), clock.clone()).await;
        store.create("k", Context::new()).await.unwrap();
        let entry = store.take("k").await.unwrap().unwrap();

        clock.advance(Duration::from_secs(5));
        assert!(store.restore("k", entry.clone()).await.unwrap());
        assert_eq!(store.get_entry("k").await.unwrap(), entry);
        assert!(!store.restore("k", entry).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let store = manager(None, Arc::new(ManualClock::new(0))).await;
        assert!(store.remove("nothing").await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_all_and_destroy() {
        let store = manager(None, Arc::new(ManualClock::new(0))).await;
        store.create("a", Context::new()).await.unwrap();
        store.create("b", Context::new()).await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 2);
        assert_eq!(store.remove_all().await.unwrap(), 2);
        assert_eq!(store.get_count().await.unwrap(), 0);
        store.destroy().await;
        store.destroy().await;
    }
}
