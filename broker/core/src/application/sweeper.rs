// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store Sweeper - Background task removing expired entries
//!
//! One sweeper runs per [`crate::application::StorageManager`] that has a
//! cleanup interval. A failing or panicking cycle is logged and the loop moves
//! on to the next tick; only the shutdown token ends it.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::storage_manager::StoreShared;

pub(crate) struct Sweeper {
    store: Arc<StoreShared>,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl Sweeper {
    pub(crate) fn new(store: Arc<StoreShared>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub(crate) fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            store = %self.store.name,
            interval_ms = self.interval.as_millis() as u64,
            "Starting store sweep task"
        );

        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => self.cycle().await,
                _ = self.shutdown_token.cancelled() => {
                    info!(store = %self.store.name, "Shutdown signal received, stopping sweep task");
                    break;
                }
            }
        }
    }

    async fn cycle(&self) {
        match AssertUnwindSafe(self.store.sweep()).catch_unwind().await {
            Ok(Ok(0)) => debug!(store = %self.store.name, "Sweep cycle found nothing to remove"),
            Ok(Ok(removed)) => info!(store = %self.store.name, removed, "Sweep cycle removed expired entries"),
            Ok(Err(e)) => warn!(store = %self.store.name, error = %e, "Sweep cycle failed"),
            Err(_) => error!(store = %self.store.name, "Sweep cycle panicked"),
        }
    }
}
