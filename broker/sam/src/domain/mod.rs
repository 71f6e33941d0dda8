// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer

pub mod errors;
pub mod group;
pub mod polling;
pub mod resource;

pub use errors::SamError;
pub use group::{GroupSnapshot, SamResourceGroup};
pub use polling::{PollError, PollingMethod};
pub use resource::{ResourceSnapshot, ResourceState, SamResource};
