// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Ticket Manager
//!
//! Tracks completed authentications (ticket-granting tickets). Same shape as
//! [`crate::application::SessionManager`] over its own store, with two extra
//! timestamps exposed:
//!
//! - **start time**: when the ticket was first issued; never changes.
//! - **timeout**: current expiry; moved forward by [`TicketManager::renew_ticket`].

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::application::context_store::ContextStore;
use crate::application::session_manager::SessionManager;
use crate::application::storage_manager::StorageManager;
use crate::domain::clock::Clock;
use crate::domain::config::StoreConfig;
use crate::domain::context::Context;
use crate::domain::entry::Entry;
use crate::domain::errors::ManagerError;
use crate::domain::identifier::IdGenerator;
use crate::domain::storage::StorageError;

pub const TICKET_STORE: &str = "ticket";

pub struct TicketManager {
    store: ContextStore,
}

impl TicketManager {
    pub async fn init(
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, StorageError> {
        let storage = StorageManager::init(TICKET_STORE, config, clock).await?;
        Ok(Self::new(storage, ids))
    }

    pub fn new(storage: StorageManager, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store: ContextStore::new(TICKET_STORE, storage, ids, "ssobroker_tickets_issued_total"),
        }
    }

    /// # Errors
    ///
    /// [`ManagerError::ServerBusy`] when the ticket store is full.
    pub async fn create_ticket(&self, context: Context) -> Result<String, ManagerError> {
        self.store.issue(context).await
    }

    /// Issue a ticket for a finished login and consume its session.
    ///
    /// Returns `Ok(None)` if the session no longer exists or a concurrent
    /// promotion claimed it first. If the ticket cannot be issued (for instance
    /// a full ticket store) the session is put back unchanged for a retry.
    pub async fn promote_session(
        &self,
        sessions: &SessionManager,
        session_id: &str,
        ticket_context: Context,
    ) -> Result<Option<String>, ManagerError> {
        let Some(session) = sessions.take_session(session_id).await? else {
            return Ok(None);
        };
        match self.create_ticket(ticket_context).await {
            Ok(ticket_id) => {
                info!("Session promoted to ticket");
                Ok(Some(ticket_id))
            }
            Err(e) => {
                sessions.restore_session(session_id, session).await;
                Err(e)
            }
        }
    }

    pub async fn get_ticket_context(&self, ticket_id: &str) -> Result<Option<Context>, ManagerError> {
        self.store.context(ticket_id).await
    }

    /// Replace the context of a live ticket without touching its timestamps.
    pub async fn update_ticket_context(&self, ticket_id: &str, context: Context) -> bool {
        self.store.update(ticket_id, context).await
    }

    /// Extend the ticket's expiry to now + TTL. The start time is kept.
    pub async fn renew_ticket(&self, ticket_id: &str) -> bool {
        self.store.renew(ticket_id).await
    }

    pub async fn kill_ticket(&self, ticket_id: &str) -> Result<(), ManagerError> {
        self.store.kill(ticket_id).await
    }

    pub async fn get_ticket_contexts(&self) -> Result<HashMap<String, Context>, ManagerError> {
        self.store.contexts().await
    }

    pub async fn get_ticket_entries(&self) -> Result<HashMap<String, Entry>, ManagerError> {
        self.store.entries().await
    }

    pub async fn get_ticket_timeout(&self, ticket_id: &str) -> Result<Option<i64>, ManagerError> {
        self.store.expiration(ticket_id).await
    }

    pub async fn get_ticket_start_time(&self, ticket_id: &str) -> Result<Option<i64>, ManagerError> {
        self.store.start_time(ticket_id).await
    }

    pub fn get_tickets_counter(&self) -> u64 {
        self.store.issued()
    }

    pub async fn get_ticket_count(&self) -> Result<u64, ManagerError> {
        self.store.live_count().await
    }

    pub fn storage(&self) -> &StorageManager {
        self.store.storage()
    }

    pub async fn destroy(&self) {
        self.store.shutdown().await;
    }
}
