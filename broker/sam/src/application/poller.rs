// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource Poller - Background task probing one resource
//!
//! Polls immediately on start, then once per group interval. Every outcome,
//! including a panicking probe, is folded into Up/Down; only the shutdown token
//! ends the loop.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use ssobroker_core::Clock;

use crate::domain::group::SamResourceGroup;
use crate::domain::polling::PollingMethod;

pub struct ResourcePoller {
    group: Arc<SamResourceGroup>,
    index: usize,
    method: Arc<dyn PollingMethod>,
    clock: Arc<dyn Clock>,
    shutdown_token: CancellationToken,
}

impl ResourcePoller {
    pub fn new(
        group: Arc<SamResourceGroup>,
        index: usize,
        method: Arc<dyn PollingMethod>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            group,
            index,
            method,
            clock,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        let resource = &self.group.resources()[self.index];
        info!(
            group = %self.group.id(),
            resource = %resource.id(),
            target = %self.method.describe(),
            interval_ms = self.group.interval().as_millis() as u64,
            "Starting resource poller"
        );

        let mut tick = interval(self.group.interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    poll_once(&self.group, self.index, self.method.as_ref(), self.clock.as_ref()).await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!(group = %self.group.id(), resource = %resource.id(), "Shutdown signal received, stopping resource poller");
                    break;
                }
            }
        }
    }
}

/// Probe one resource and record the outcome on its group.
pub(crate) async fn poll_once(group: &SamResourceGroup, index: usize, method: &dyn PollingMethod, clock: &dyn Clock) {
    let Some(resource) = group.resources().get(index) else {
        return;
    };

    let up = match AssertUnwindSafe(method.poll()).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(group = %group.id(), resource = %resource.id(), error = %e, "Poll failed");
            false
        }
        Err(_) => {
            error!(group = %group.id(), resource = %resource.id(), "Poll panicked");
            false
        }
    };

    group.record_poll(index, up, clock.now_millis());
    metrics::gauge!(
        "ssobroker_sam_resource_up",
        "group" => group.id().to_string(),
        "resource" => resource.id().to_string()
    )
    .set(if up { 1.0 } else { 0.0 });
}
