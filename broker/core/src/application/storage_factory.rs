// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Storage Backend Factory - Application Layer
//!
//! Creates the concrete [`StorageBackend`] selected by a store's `backend`
//! configuration block.

use std::sync::Arc;

use crate::domain::config::{resolve_secret, BackendConfig};
use crate::domain::storage::{StorageBackend, StorageError};
use crate::infrastructure::memory::InMemoryStorageBackend;
use crate::infrastructure::postgres::PostgresStorageBackend;

pub async fn create_storage_backend(config: &BackendConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    match config {
        BackendConfig::Memory => Ok(Arc::new(InMemoryStorageBackend::new())),
        BackendConfig::Postgres {
            connection_string,
            table,
            max_connections,
            acquire_timeout,
        } => {
            if connection_string.trim().is_empty() {
                return Err(StorageError::Configuration(
                    "postgres backend requires a connection_string".to_string(),
                ));
            }
            let url = resolve_secret(connection_string).map_err(|e| StorageError::Configuration(e.to_string()))?;
            let backend =
                PostgresStorageBackend::connect(&url, table.clone(), *max_connections, *acquire_timeout).await?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_factory_memory() {
        let backend = create_storage_backend(&BackendConfig::Memory).await.unwrap();
        assert_eq!(backend.kind(), "memory");
    }

    #[tokio::test]
    async fn test_factory_postgres_requires_connection_string() {
        let result = create_storage_backend(&BackendConfig::Postgres {
            connection_string: "  ".to_string(),
            table: "t".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_millis(100),
        })
        .await;
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }
}
