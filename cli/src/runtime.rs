// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Broker composition root
//!
//! Builds the session manager, ticket manager and SAM agent from one manifest
//! and tears them down in reverse order. Nothing here is global: the caller
//! owns the [`Broker`] and hands references to whatever needs them.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use ssobroker_core::application::{SessionManager, TicketManager};
use ssobroker_core::domain::config::{BrokerConfigManifest, StoreConfig};
use ssobroker_core::{Clock, IdGenerator, SecureRandomIds, SystemClock};
use ssobroker_sam::SamAgent;

pub struct Broker {
    pub sessions: SessionManager,
    pub tickets: TicketManager,
    pub sam: Option<SamAgent>,
}

impl Broker {
    /// Start every subsystem with its background tasks.
    pub async fn start(manifest: &BrokerConfigManifest) -> Result<Self> {
        let broker = Self::build(manifest, true).await?;
        info!(
            name = %manifest.metadata.name,
            sam_groups = broker.sam.as_ref().map_or(0, |sam| sam.group_ids().len()),
            "Broker started"
        );
        Ok(broker)
    }

    /// Connect to the configured stores and build the SAM agent without
    /// starting any sweep or poll task.
    pub async fn inspect(manifest: &BrokerConfigManifest) -> Result<Self> {
        Self::build(manifest, false).await
    }

    async fn build(manifest: &BrokerConfigManifest, background: bool) -> Result<Self> {
        manifest.validate().context("Configuration validation failed")?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(SecureRandomIds::default());

        let sessions = SessionManager::init(&store_config(&manifest.spec.sessions, background), clock.clone(), ids.clone())
            .await
            .context("Failed to initialise session store")?;
        let tickets = TicketManager::init(&store_config(&manifest.spec.tickets, background), clock.clone(), ids)
            .await
            .context("Failed to initialise ticket store")?;

        let sam = match &manifest.spec.sam {
            Some(config) if background => Some(SamAgent::init(config, clock)?),
            Some(config) => Some(SamAgent::from_config(config, clock)?),
            None => None,
        };

        Ok(Self { sessions, tickets, sam })
    }

    /// Stop pollers, then tickets, then sessions. Clears both stores.
    pub async fn shutdown(&self) {
        if let Some(sam) = &self.sam {
            sam.destroy().await;
        }
        self.tickets.destroy().await;
        self.sessions.destroy().await;
        info!("Broker stopped");
    }

    /// Release connections and stop tasks without touching stored entries.
    pub async fn detach(&self) {
        if let Some(sam) = &self.sam {
            sam.destroy().await;
        }
        self.tickets.storage().destroy().await;
        self.sessions.storage().destroy().await;
    }
}

fn store_config(config: &StoreConfig, background: bool) -> StoreConfig {
    let mut config = config.clone();
    if !background {
        config.interval = None;
    }
    config
}
