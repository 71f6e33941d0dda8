// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Errors surfaced by the session and ticket managers to request handlers.

use thiserror::Error;

/// Outcome of a failed session/ticket operation as seen by the authentication flow.
///
/// Storage-level detail is logged where it happens and collapsed here into
/// two answers: "busy, try later" or "broken".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// The store is at its configured maximum.
    #[error("server busy: {0} store is full")]
    ServerBusy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    /// Whether the caller should answer "try again later" rather than "failed".
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerBusy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_busy_is_retryable() {
        assert!(ManagerError::ServerBusy("session".into()).is_retryable());
        assert!(!ManagerError::Internal("boom".into()).is_retryable());
    }
}
