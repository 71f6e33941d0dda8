// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Backend Implementations
//!
//! Concrete implementations of [`crate::domain::storage::StorageBackend`].
//!
//! - **InMemoryStorageBackend** - `HashMap` behind a `parking_lot::Mutex`, for
//!   single-node deployments and tests
//! - **PostgresStorageBackend** - one table per store, owned by a single broker
//!   process

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStorageBackend;
pub use postgres::PostgresStorageBackend;
