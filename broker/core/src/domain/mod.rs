// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure types shared by every store and by the resource-management agent.
//! No I/O lives here apart from reading the configuration manifest.

pub mod clock;
pub mod config;
pub mod context;
pub mod entry;
pub mod errors;
pub mod identifier;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::Context;
pub use entry::Entry;
pub use errors::ManagerError;
pub use identifier::{IdGenerator, ScriptedIds, SecureRandomIds};
pub use storage::{StorageBackend, StorageError};
