// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL Storage Backend
//!
//! One table per store:
//!
//! ```text
//! key_hash   TEXT PRIMARY KEY   -- SHA-256 of the key, hex
//! key_value  TEXT NOT NULL      -- the key itself, returned by get_all
//! context    JSONB NOT NULL
//! created_at BIGINT NOT NULL    -- epoch ms
//! expires_at BIGINT NOT NULL    -- epoch ms, indexed for the sweep
//! ```
//!
//! `key_hash` only gives the primary key a fixed width. The key is also kept in
//! clear in `key_value`, so the table must be protected like any other store
//! of bearer credentials.
//!
//! A table belongs to one broker process. Single-key inserts are atomic in the
//! database, but capacity checks and `remove_all` on shutdown assume no other
//! writer shares the table.
//!
//! The table is created on `init` if missing. Every call borrows one pooled
//! connection for the duration of a single statement; the pool's
//! `acquire_timeout` bounds how long a caller can wait for it.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use crate::domain::context::Context;
use crate::domain::entry::Entry;
use crate::domain::storage::{StorageBackend, StorageError};

pub struct PostgresStorageBackend {
    pool: PgPool,
    table: String,
}

impl PostgresStorageBackend {
    /// Open a pool against `connection_string`. Fails if the server cannot be reached.
    pub async fn connect(
        connection_string: &str,
        table: impl Into<String>,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(connection_string)
            .await?;

        Ok(Self::new_with_pool(pool, table))
    }

    pub fn new_with_pool(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    fn decode_row(row: &PgRow) -> Result<(String, Entry), StorageError> {
        let key: String = row.try_get("key_value")?;
        let Json(context): Json<Context> = row.try_get("context")?;
        let entry = Entry {
            context,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        };
        Ok((key, entry))
    }
}

pub(crate) fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[async_trait]
impl StorageBackend for PostgresStorageBackend {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                key_hash   TEXT PRIMARY KEY,
                key_value  TEXT NOT NULL,
                context    JSONB NOT NULL,
                created_at BIGINT NOT NULL,
                expires_at BIGINT NOT NULL
            )
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_expires_at_idx ON {table} (expires_at)",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        info!(table = %self.table, "PostgreSQL store table ready");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT key_value, context, created_at, expires_at FROM {} WHERE key_hash = $1",
            self.table
        ))
        .bind(hash_key(key))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::decode_row(&r).map(|(_, entry)| entry)).transpose()
    }

    async fn get_all(&self) -> Result<HashMap<String, Entry>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT key_value, context, created_at, expires_at FROM {}",
            self.table
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_row).collect()
    }

    async fn insert_if_absent(&self, key: &str, entry: &Entry) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {} (key_hash, key_value, context, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key_hash) DO NOTHING
            "#,
            self.table
        ))
        .bind(hash_key(key))
        .bind(key)
        .bind(Json(&entry.context))
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn put(&self, key: &str, entry: &Entry) -> Result<(), StorageError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (key_hash, key_value, context, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key_hash) DO UPDATE SET
                context = EXCLUDED.context,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
            self.table
        ))
        .bind(hash_key(key))
        .bind(key)
        .bind(Json(&entry.context))
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, key: &str, entry: &Entry) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET context = $2, created_at = $3, expires_at = $4 WHERE key_hash = $1",
            self.table
        ))
        .bind(hash_key(key))
        .bind(Json(&entry.context))
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE key_hash = $1", self.table))
            .bind(hash_key(key))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_all(&self) -> Result<u64, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn cleanup(&self, now_ms: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE expires_at <= $1", self.table))
            .bind(now_ms)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        let row = sqlx::query(&format!("SELECT 1 FROM {} WHERE key_hash = $1", self.table))
            .bind(hash_key(key))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
