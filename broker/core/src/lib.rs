// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `ssobroker-core` - Session, Ticket and Storage Management
//!
//! The broker issues two kinds of short-lived records: **sessions** (an
//! authentication attempt in progress) and **tickets** (a completed, valid
//! authentication). Both are kept in a [`application::StorageManager`], a
//! capacity- and TTL-bounded key/value store over a pluggable
//! [`domain::storage::StorageBackend`].
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Context`, `Entry`, clocks, id generators, errors, config manifest |
//! | [`application`] | Application | `StorageManager`, `SessionManager`, `TicketManager`, monitor views |
//! | [`infrastructure`] | Infrastructure | In-memory and PostgreSQL storage backends |

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
