// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Liveness probe abstraction.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("resource unreachable: {0}")]
    Unreachable(String),

    #[error("unexpected status {actual} (expected {expected})")]
    UnexpectedStatus { expected: String, actual: u16 },

    #[error("probe failed: {0}")]
    Failed(String),
}

/// One way of asking a resource whether it is alive.
///
/// Implementations bound their own duration; the poll task treats any `Err`
/// as "down" and never retries within a cycle.
#[async_trait]
pub trait PollingMethod: Send + Sync {
    /// Short human-readable target, e.g. `tcp://10.0.0.1:5432`. Must not leak credentials.
    fn describe(&self) -> String;

    async fn poll(&self) -> Result<(), PollError>;
}
