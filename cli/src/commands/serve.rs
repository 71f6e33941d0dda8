// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `ssobroker serve` - run the broker core until interrupted

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use ssobroker_core::domain::config::BrokerConfigManifest;

use crate::runtime::Broker;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let manifest = BrokerConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    if let Some(metrics) = manifest
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.metrics.as_ref())
        .filter(|m| m.enabled)
    {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], metrics.port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port = metrics.port, "Prometheus exporter listening");
    }

    let broker = Broker::start(&manifest).await?;

    shutdown_signal().await;
    info!("Broker shutting down");
    broker.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
