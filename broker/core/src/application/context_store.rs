// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identifier-issuing context store shared by the session and ticket managers.
//!
//! Both managers are the same pattern over two independent
//! [`StorageManager`]s: allocate a random id, insert atomically, count the issue,
//! and collapse storage failures into [`ManagerError`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::storage_manager::StorageManager;
use crate::domain::context::Context;
use crate::domain::entry::Entry;
use crate::domain::errors::ManagerError;
use crate::domain::identifier::IdGenerator;
use crate::domain::storage::StorageError;

/// Upper bound on id re-draws after collisions before giving up.
pub const MAX_ID_ATTEMPTS: usize = 16;

pub(crate) struct ContextStore {
    kind: &'static str,
    storage: StorageManager,
    ids: Arc<dyn IdGenerator>,
    issued: AtomicU64,
    issued_metric: &'static str,
}

impl ContextStore {
    pub(crate) fn new(
        kind: &'static str,
        storage: StorageManager,
        ids: Arc<dyn IdGenerator>,
        issued_metric: &'static str,
    ) -> Self {
        Self {
            kind,
            storage,
            ids,
            issued: AtomicU64::new(0),
            issued_metric,
        }
    }

    pub(crate) fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub(crate) async fn issue(&self, context: Context) -> Result<String, ManagerError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            match self.storage.create(&id, context.clone()).await {
                Ok(true) => {
                    self.issued.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(self.issued_metric).increment(1);
                    debug!(kind = self.kind, id = %id, attempt, "Issued new {}", self.kind);
                    return Ok(id);
                }
                Ok(false) => {
                    warn!(kind = self.kind, attempt, "Generated {} id already in use, drawing another", self.kind);
                }
                Err(StorageError::CapacityExceeded { max, .. }) => {
                    warn!(kind = self.kind, max, "Cannot issue {}: store is full", self.kind);
                    return Err(ManagerError::ServerBusy(self.kind.to_string()));
                }
                Err(e) => return Err(self.internal("create", e)),
            }
        }

        error!(kind = self.kind, attempts = MAX_ID_ATTEMPTS, "Could not allocate a unique {} id", self.kind);
        Err(ManagerError::Internal(format!(
            "no unique {} id after {} attempts",
            self.kind, MAX_ID_ATTEMPTS
        )))
    }

    pub(crate) async fn context(&self, id: &str) -> Result<Option<Context>, ManagerError> {
        self.optional("get", self.storage.get(id).await)
    }

    pub(crate) async fn update(&self, id: &str, context: Context) -> bool {
        match self.storage.update(id, context).await {
            Ok(()) => true,
            Err(StorageError::NotFound { .. }) => false,
            Err(e) => {
                error!(kind = self.kind, id = %id, error = %e, "Failed to update {}", self.kind);
                false
            }
        }
    }

    pub(crate) async fn renew(&self, id: &str) -> bool {
        match self.storage.refresh_expiration(id).await {
            Ok(expires_at) => {
                debug!(kind = self.kind, id = %id, expires_at, "Renewed {}", self.kind);
                true
            }
            Err(StorageError::NotFound { .. }) => false,
            Err(e) => {
                error!(kind = self.kind, id = %id, error = %e, "Failed to renew {}", self.kind);
                false
            }
        }
    }

    pub(crate) async fn kill(&self, id: &str) -> Result<(), ManagerError> {
        self.storage.remove(id).await.map_err(|e| self.internal("remove", e))
    }

    /// Atomically remove `id`, handing its entry to exactly one caller.
    pub(crate) async fn take(&self, id: &str) -> Result<Option<Entry>, ManagerError> {
        self.storage.take(id).await.map_err(|e| self.internal("take", e))
    }

    /// Best-effort undo of [`ContextStore::take`].
    pub(crate) async fn restore(&self, id: &str, entry: Entry) {
        match self.storage.restore(id, entry).await {
            Ok(true) => debug!(kind = self.kind, id = %id, "Restored {}", self.kind),
            Ok(false) => warn!(kind = self.kind, id = %id, "Could not restore {}: id reused", self.kind),
            Err(e) => warn!(kind = self.kind, id = %id, error = %e, "Could not restore {}", self.kind),
        }
    }

    pub(crate) async fn entries(&self) -> Result<HashMap<String, Entry>, ManagerError> {
        self.storage.get_all().await.map_err(|e| self.internal("get_all", e))
    }

    pub(crate) async fn contexts(&self) -> Result<HashMap<String, Context>, ManagerError> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|(id, entry)| (id, entry.context))
            .collect())
    }

    pub(crate) async fn expiration(&self, id: &str) -> Result<Option<i64>, ManagerError> {
        self.optional("get_expiration_time", self.storage.get_expiration_time(id).await)
    }

    pub(crate) async fn start_time(&self, id: &str) -> Result<Option<i64>, ManagerError> {
        self.optional("get_timestamp", self.storage.get_timestamp(id).await)
    }

    pub(crate) fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    pub(crate) async fn live_count(&self) -> Result<u64, ManagerError> {
        self.storage.get_count().await.map_err(|e| self.internal("get_count", e))
    }

    /// Drop every entry, then stop the sweep and release the backend.
    pub(crate) async fn shutdown(&self) {
        if let Err(e) = self.storage.remove_all().await {
            warn!(kind = self.kind, error = %e, "Could not clear store during shutdown");
        }
        self.storage.destroy().await;
        info!(kind = self.kind, issued = self.issued(), "{} manager stopped", self.kind);
    }

    fn optional<T>(&self, operation: &str, result: Result<T, StorageError>) -> Result<Option<T>, ManagerError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(self.internal(operation, e)),
        }
    }

    fn internal(&self, operation: &str, e: StorageError) -> ManagerError {
        error!(kind = self.kind, operation, error = %e, "Unexpected storage failure");
        ManagerError::Internal(format!("{} {} failed: {}", self.kind, operation, e))
    }
}
