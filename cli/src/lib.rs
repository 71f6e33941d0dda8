// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SSO broker CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Composition root for the session, ticket and SAM subsystems

pub mod commands;
pub mod logging;
pub mod runtime;
