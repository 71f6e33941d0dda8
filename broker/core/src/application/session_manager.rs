// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Session Manager
//!
//! Tracks in-progress authentication attempts. A session is created when a
//! request handler starts a login, updated as the flow moves between AuthSPs,
//! and killed either explicitly (cancel, promotion to a ticket) or by the sweep
//! once its TTL passes.
//!
//! Exactly one instance exists per broker process. It is constructed by the
//! composition root and handed to request handlers; there is no global handle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::context_store::ContextStore;
use crate::application::storage_manager::StorageManager;
use crate::domain::clock::Clock;
use crate::domain::config::StoreConfig;
use crate::domain::context::Context;
use crate::domain::entry::Entry;
use crate::domain::errors::ManagerError;
use crate::domain::identifier::IdGenerator;
use crate::domain::storage::StorageError;

pub const SESSION_STORE: &str = "session";

pub struct SessionManager {
    store: ContextStore,
}

impl SessionManager {
    pub async fn init(
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, StorageError> {
        let storage = StorageManager::init(SESSION_STORE, config, clock).await?;
        Ok(Self::new(storage, ids))
    }

    pub fn new(storage: StorageManager, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store: ContextStore::new(SESSION_STORE, storage, ids, "ssobroker_sessions_issued_total"),
        }
    }

    /// Store `context` under a fresh random session id.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::ServerBusy`] - the session store is full
    /// - [`ManagerError::Internal`] - backend failure
    pub async fn create_session(&self, context: Context) -> Result<String, ManagerError> {
        self.store.issue(context).await
    }

    /// `Ok(None)` for unknown or already swept sessions.
    pub async fn get_session_context(&self, session_id: &str) -> Result<Option<Context>, ManagerError> {
        self.store.context(session_id).await
    }

    /// Replace the context of a live session. `false` if the session does not
    /// exist or the backend failed; its expiry is not extended.
    pub async fn update_session_context(&self, session_id: &str, context: Context) -> bool {
        self.store.update(session_id, context).await
    }

    pub async fn kill_session(&self, session_id: &str) -> Result<(), ManagerError> {
        self.store.kill(session_id).await
    }

    /// Remove a session and return it, for promotion. Concurrent callers race
    /// for it; only one gets `Some`.
    pub(crate) async fn take_session(&self, session_id: &str) -> Result<Option<Entry>, ManagerError> {
        self.store.take(session_id).await
    }

    pub(crate) async fn restore_session(&self, session_id: &str, session: Entry) {
        self.store.restore(session_id, session).await;
    }

    pub async fn get_session_contexts(&self) -> Result<HashMap<String, Context>, ManagerError> {
        self.store.contexts().await
    }

    pub async fn get_session_entries(&self) -> Result<HashMap<String, Entry>, ManagerError> {
        self.store.entries().await
    }

    /// Expiry timestamp (epoch ms) of a live session.
    pub async fn get_session_timeout(&self, session_id: &str) -> Result<Option<i64>, ManagerError> {
        self.store.expiration(session_id).await
    }

    /// Sessions issued since process start.
    pub fn get_sessions_counter(&self) -> u64 {
        self.store.issued()
    }

    pub async fn get_session_count(&self) -> Result<u64, ManagerError> {
        self.store.live_count().await
    }

    pub fn storage(&self) -> &StorageManager {
        self.store.storage()
    }

    pub async fn destroy(&self) {
        self.store.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::identifier::{ScriptedIds, SecureRandomIds};
    use serde_json::Value;
    use std::time::Duration;

    async fn sessions(max: Option<u64>, ids: Arc<dyn IdGenerator>) -> SessionManager {
        let config = StoreConfig {
            max,
            ..StoreConfig::in_memory(Duration::from_secs(300))
        };
        SessionManager::init(&config, Arc::new(ManualClock::new(0)), ids)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_get_update_round_trip() {
        let manager = sessions(None, Arc::new(ScriptedIds::new(["abc"]))).await;

        let context = Context::new().with("rid", "R1").with("uid", Value::Null);
        let id = manager.create_session(context.clone()).await.unwrap();
        assert_eq!(id, "abc");
        assert_eq!(manager.get_session_context("abc").await.unwrap(), Some(context));

        let updated = Context::new().with("rid", "R1").with("uid", "alice");
        assert!(manager.update_session_context("abc", updated).await);

        let stored = manager.get_session_context("abc").await.unwrap().unwrap();
        assert_eq!(stored.get_str("uid"), Some("alice"));
        assert_eq!(stored.get_str("rid"), Some("R1"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_absent_not_error() {
        let manager = sessions(None, Arc::new(SecureRandomIds::default())).await;
        assert_eq!(manager.get_session_context("bogus").await.unwrap(), None);
        assert_eq!(manager.get_session_timeout("bogus").await.unwrap(), None);
        assert!(!manager.update_session_context("bogus", Context::new()).await);
        assert!(manager.kill_session("bogus").await.is_ok());
    }

    #[tokio::test]
    async fn test_full_store_reports_server_busy() {
        let manager = sessions(Some(1), Arc::new(SecureRandomIds::default())).await;
        manager.create_session(Context::new()).await.unwrap();

        let err = manager.create_session(Context::new()).await.unwrap_err();
        assert_eq!(err, ManagerError::ServerBusy(SESSION_STORE.to_string()));
        assert!(err.is_retryable());
        assert_eq!(manager.get_sessions_counter(), 1);
    }

    #[tokio::test]
    async fn test_collision_draws_new_id() {
        let manager = sessions(None, Arc::new(ScriptedIds::new(["same", "same", "other"]))).await;
        assert_eq!(manager.create_session(Context::new()).await.unwrap(), "same");
        assert_eq!(manager.create_session(Context::new()).await.unwrap(), "other");
        assert_eq!(manager.get_sessions_counter(), 2);
        assert_eq!(manager.get_session_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_id_attempts_is_internal() {
        use crate::application::context_store::MAX_ID_ATTEMPTS;

        let ids = std::iter::repeat("stuck").take(MAX_ID_ATTEMPTS + 1);
        let manager = sessions(None, Arc::new(ScriptedIds::new(ids))).await;
        manager.create_session(Context::new()).await.unwrap();

        let err = manager.create_session(Context::new()).await.unwrap_err();
        assert!(matches!(err, ManagerError::Internal(_)));
    }

    #[tokio::test]
    async fn test_kill_and_contexts() {
        let manager = sessions(None, Arc::new(ScriptedIds::new(["s1", "s2"]))).await;
        manager.create_session(Context::new().with("n", "1")).await.unwrap();
        manager.create_session(Context::new().with("n", "2")).await.unwrap();

        manager.kill_session("s1").await.unwrap();
        let all = manager.get_session_contexts().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["s2"].get_str("n"), Some("2"));
        assert_eq!(manager.get_session_timeout("s2").await.unwrap(), Some(300_000));

        manager.destroy().await;
        assert_eq!(manager.get_session_count().await.unwrap(), 0);
    }
}
