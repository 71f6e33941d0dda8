// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Logging setup shared by every command.
//!
//! `--log-level` / `--log-format` (or their env vars) win; otherwise the
//! manifest's `spec.observability.logging` section applies; otherwise
//! `info` / `text`. `RUST_LOG` overrides the level filter when set.

use anyhow::{Context, Result};

use ssobroker_core::domain::config::{BrokerConfigManifest, LoggingConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

impl LogSettings {
    pub fn resolve(level: Option<String>, format: Option<String>, manifest: Option<&BrokerConfigManifest>) -> Self {
        let configured = manifest
            .and_then(|m| m.spec.observability.as_ref())
            .and_then(|o| o.logging.clone())
            .unwrap_or_default();

        Self {
            level: level.unwrap_or(configured.level),
            format: format.unwrap_or(configured.format),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        let LoggingConfig { level, format } = LoggingConfig::default();
        Self { level, format }
    }
}

/// Initialize the global tracing subscriber.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&settings.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match settings.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
