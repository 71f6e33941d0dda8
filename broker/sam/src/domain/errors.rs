// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use ssobroker_core::domain::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamError {
    /// Unknown group, or no resource in it is currently up.
    #[error("resource group unavailable: {0}")]
    ResourceGroupUnavailable(String),

    #[error("sam configuration error: {0}")]
    Configuration(String),
}

impl SamError {
    /// Whether the caller should answer "try again later" rather than "failed".
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceGroupUnavailable(_))
    }
}

impl From<ConfigError> for SamError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_group_is_retryable() {
        assert!(SamError::ResourceGroupUnavailable("db".into()).is_retryable());
        assert!(!SamError::Configuration("no groups".into()).is_retryable());
    }

    #[test]
    fn test_config_error_converts() {
        let err: SamError = ConfigError::Invalid("empty".into()).into();
        assert!(matches!(err, SamError::Configuration(msg) if msg.contains("empty")));
    }
}
