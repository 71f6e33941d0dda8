// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use std::time::Duration;

use crate::domain::polling::{PollError, PollingMethod};

/// Opens a fresh connection each poll, runs `SELECT 1`, and closes it.
pub struct PostgresPoller {
    options: PgConnectOptions,
    timeout: Duration,
}

impl PostgresPoller {
    pub fn new(options: PgConnectOptions, timeout: Duration) -> Self {
        Self { options, timeout }
    }

    async fn probe(&self) -> Result<(), sqlx::Error> {
        let mut conn: PgConnection = self.options.connect().await?;
        sqlx::query("SELECT 1").execute(&mut conn).await?;
        conn.close().await
    }
}

#[async_trait]
impl PollingMethod for PostgresPoller {
    fn describe(&self) -> String {
        format!(
            "postgres://{}:{}/{}",
            self.options.get_host(),
            self.options.get_port(),
            self.options.get_database().unwrap_or_default()
        )
    }

    async fn poll(&self) -> Result<(), PollError> {
        match tokio::time::timeout(self.timeout, self.probe()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PollError::Unreachable(e.to_string())),
            Err(_) => Err(PollError::Timeout(self.timeout)),
        }
    }
}
