// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Stored record: a [`Context`] plus its creation and expiry timestamps.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::context::Context;

/// One live record in a store.
///
/// Timestamps are wall-clock milliseconds since the Unix epoch. `expires_at`
/// starts as `created_at + ttl` and only moves when a caller explicitly asks
/// for it (ticket renewal); reads never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub context: Context,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Entry {
    pub fn new(context: Context, now_ms: i64, ttl: Duration) -> Self {
        Self {
            context,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_millis(ttl)),
        }
    }

    /// An entry is expired once `expires_at` is at or before `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    /// Same timestamps, new context.
    pub fn with_context(&self, context: Context) -> Self {
        Self {
            context,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

pub(crate) fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
