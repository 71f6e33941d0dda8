// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `ssobroker-sam` - Resource Availability Management
//!
//! Tracks liveness of redundant backend resources (directory servers, databases)
//! grouped by logical role, and answers "which one should I use right now?".
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `SamResource`, `SamResourceGroup`, `PollingMethod`, `SamError` |
//! | [`application`] | Application | `SamAgent`, per-resource poll task, polling factory |
//! | [`infrastructure`] | Infrastructure | HTTP, TCP and PostgreSQL probes |
//!
//! ## Key Concepts
//!
//! - **Resource state**: `Unknown` until first polled, then `Up` or `Down`
//!   according to the latest poll only.
//! - **Active resource**: the first `Up` resource of a group in configured
//!   priority order, recomputed after every poll.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::SamAgent;
