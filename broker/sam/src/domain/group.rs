// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Ordered set of interchangeable resources sharing a logical role.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::resource::{ResourceSnapshot, ResourceState, SamResource};

pub struct SamResourceGroup {
    id: String,
    interval: Duration,
    /// Priority order.
    resources: Vec<Arc<SamResource>>,
    active: RwLock<Option<usize>>,
}

impl SamResourceGroup {
    pub fn new(id: impl Into<String>, interval: Duration, resources: Vec<SamResource>) -> Self {
        Self {
            id: id.into(),
            interval,
            resources: resources.into_iter().map(Arc::new).collect(),
            active: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn resources(&self) -> &[Arc<SamResource>] {
        &self.resources
    }

    /// The current pick, `None` while no resource is up.
    pub fn active_resource(&self) -> Option<Arc<SamResource>> {
        self.active.read().map(|index| self.resources[index].clone())
    }

    /// Apply a poll outcome for the resource at `index` and recompute the
    /// active pick.
    pub fn record_poll(&self, index: usize, up: bool, now_ms: i64) {
        let Some(resource) = self.resources.get(index) else {
            return;
        };

        // Held across record + recompute so concurrent pollers of one group
        // publish picks in the order their outcomes were applied.
        let mut active = self.active.write();
        let previous = resource.record(up, now_ms);
        let current = resource.state();
        if previous != current {
            match current {
                ResourceState::Up => info!(group = %self.id, resource = %resource.id(), from = %previous, "Resource is up"),
                _ => warn!(group = %self.id, resource = %resource.id(), from = %previous, "Resource is down"),
            }
        }

        let pick = self.resources.iter().position(|r| r.is_up());
        if pick != *active {
            match pick {
                Some(i) => info!(
                    group = %self.id,
                    resource = %self.resources[i].id(),
                    "Active resource changed"
                ),
                None => warn!(group = %self.id, "No resource in group is up"),
            }
            *active = pick;
        }
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            id: self.id.clone(),
            active: self.active_resource().map(|r| r.id().to_string()),
            resources: self.resources.iter().map(|r| r.snapshot()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSnapshot {
    pub id: String,
    pub active: Option<String>,
    pub resources: Vec<ResourceSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn group() -> SamResourceGroup {
        SamResourceGroup::new(
            "db",
            Duration::from_secs(10),
            vec![
                SamResource::new("A", HashMap::new()),
                SamResource::new("B", HashMap::new()),
            ],
        )
    }

    fn active_id(group: &SamResourceGroup) -> Option<String> {
        group.active_resource().map(|r| r.id().to_string())
    }

    #[test]
    fn test_nothing_active_before_first_poll() {
        let group = group();
        assert_eq!(active_id(&group), None);
        assert_eq!(group.snapshot().resources[0].state, ResourceState::Unknown);
    }

    #[test]
    fn test_failover_follows_priority() {
        let group = group();
        group.record_poll(0, true, 1);
        group.record_poll(1, false, 1);
        assert_eq!(active_id(&group).as_deref(), Some("A"));

        group.record_poll(0, false, 2);
        assert_eq!(active_id(&group), None);
        group.record_poll(1, true, 2);
        assert_eq!(active_id(&group).as_deref(), Some("B"));

        group.record_poll(1, false, 3);
        assert_eq!(active_id(&group), None);

        group.record_poll(0, true, 4);
        group.record_poll(1, true, 4);
        assert_eq!(active_id(&group).as_deref(), Some("A"));
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let group = group();
        group.record_poll(7, true, 1);
        assert_eq!(active_id(&group), None);
    }
}
