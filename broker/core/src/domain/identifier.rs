// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session and ticket identifier generation.
//!
//! Identifiers are drawn from the operating system CSPRNG and hex encoded.
//! Uniqueness is still checked at insert time by the store; the generator
//! only has to make collisions improbable.

use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use std::collections::VecDeque;

/// Minimum number of random bytes in an identifier.
pub const MIN_ID_BYTES: usize = 8;

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Hex-encoded identifiers from `OsRng`.
#[derive(Debug, Clone, Copy)]
pub struct SecureRandomIds {
    bytes: usize,
}

impl SecureRandomIds {
    /// `bytes` is clamped to at least [`MIN_ID_BYTES`].
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(MIN_ID_BYTES),
        }
    }
}

impl Default for SecureRandomIds {
    fn default() -> Self {
        Self::new(16)
    }
}

impl IdGenerator for SecureRandomIds {
    fn generate(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        OsRng.fill_bytes(&mut buf);
        hex::encode(buf)
    }
}

/// Hands out a fixed sequence of identifiers, then falls back to random ones.
///
/// Lets tests force collisions between concurrent creators.
pub struct ScriptedIds {
    queue: Mutex<VecDeque<String>>,
    fallback: SecureRandomIds,
}

impl ScriptedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(ids.into_iter().map(Into::into).collect()),
            fallback: SecureRandomIds::default(),
        }
    }
}

impl IdGenerator for ScriptedIds {
    fn generate(&self) -> String {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.generate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_hex_of_requested_length() {
        let ids = SecureRandomIds::new(16);
        let id = ids.generate();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, ids.generate());
    }

    #[test]
    fn test_short_ids_are_clamped() {
        assert_eq!(SecureRandomIds::new(2).generate().len(), MIN_ID_BYTES * 2);
    }

    #[test]
    fn test_scripted_ids_then_random() {
        let ids = ScriptedIds::new(["a", "a"]);
        assert_eq!(ids.generate(), "a");
        assert_eq!(ids.generate(), "a");
        assert_eq!(ids.generate().len(), 32);
    }
}
