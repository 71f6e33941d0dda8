// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! - [`StorageManager`] - bounded, expiring key/value store with its sweep task
//! - [`SessionManager`] / [`TicketManager`] - id-issuing stores used by the
//!   authentication flow
//! - [`monitor`] - read-only views of both stores for operators

pub(crate) mod context_store;
pub mod monitor;
pub mod session_manager;
pub mod storage_factory;
pub mod storage_manager;
pub(crate) mod sweeper;
pub mod ticket_manager;

pub use context_store::MAX_ID_ATTEMPTS;
pub use monitor::{EntryRow, StoreView};
pub use session_manager::SessionManager;
pub use storage_factory::create_storage_backend;
pub use storage_manager::StorageManager;
pub use ticket_manager::TicketManager;
