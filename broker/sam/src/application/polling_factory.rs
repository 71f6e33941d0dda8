// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Polling Method Factory - Application Layer
//!
//! Creates the concrete [`PollingMethod`] selected by a resource's `polling`
//! block. Connection strings may use `env:VAR` indirection.

use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::sync::Arc;

use ssobroker_core::domain::config::{resolve_secret, PollingConfig};

use crate::domain::errors::SamError;
use crate::domain::polling::PollingMethod;
use crate::infrastructure::{HttpPoller, PostgresPoller, TcpPoller};

pub fn create_polling_method(
    config: &PollingConfig,
    client: &reqwest::Client,
) -> Result<Arc<dyn PollingMethod>, SamError> {
    match config {
        PollingConfig::Http {
            url,
            expected_status,
            timeout,
        } => {
            if url.trim().is_empty() {
                return Err(SamError::Configuration("http polling requires a url".to_string()));
            }
            Ok(Arc::new(HttpPoller::new(client.clone(), url.clone(), *expected_status, *timeout)))
        }
        PollingConfig::Tcp { address, timeout } => {
            if address.trim().is_empty() {
                return Err(SamError::Configuration("tcp polling requires an address".to_string()));
            }
            Ok(Arc::new(TcpPoller::new(address.clone(), *timeout)))
        }
        PollingConfig::Postgres {
            connection_string,
            timeout,
        } => {
            let url = resolve_secret(connection_string)?;
            let options = PgConnectOptions::from_str(&url)
                .map_err(|e| SamError::Configuration(format!("invalid postgres connection string: {e}")))?;
            Ok(Arc::new(PostgresPoller::new(options, *timeout)))
        }
    }
}
