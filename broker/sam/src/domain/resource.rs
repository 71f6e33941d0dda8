// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! A single pollable backend resource.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Liveness as of the latest poll.
///
/// Transitions: Unknown → Up, Unknown → Down, Up → Down, Down → Up. Nothing
/// moves a resource back to Unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Unknown,
    Up,
    Down,
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: ResourceState,
    last_checked: Option<i64>,
}

#[derive(Debug)]
pub struct SamResource {
    id: String,
    attributes: HashMap<String, String>,
    status: RwLock<Status>,
}

impl SamResource {
    pub fn new(id: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        Self {
            id: id.into(),
            attributes,
            status: RwLock::new(Status {
                state: ResourceState::Unknown,
                last_checked: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Connection attributes handed to callers once this resource is chosen.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn state(&self) -> ResourceState {
        self.status.read().state
    }

    /// Epoch ms of the latest poll, `None` before the first one.
    pub fn last_checked(&self) -> Option<i64> {
        self.status.read().last_checked
    }

    pub fn is_up(&self) -> bool {
        self.state() == ResourceState::Up
    }

    /// Apply a poll outcome. Returns the previous state.
    pub(crate) fn record(&self, up: bool, now_ms: i64) -> ResourceState {
        let mut status = self.status.write();
        let previous = status.state;
        status.state = if up { ResourceState::Up } else { ResourceState::Down };
        status.last_checked = Some(now_ms);
        previous
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        let status = *self.status.read();
        ResourceSnapshot {
            id: self.id.clone(),
            state: status.state,
            last_checked: status.last_checked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    pub id: String,
    pub state: ResourceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
}
