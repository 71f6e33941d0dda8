// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SAM Agent
//!
//! Registry of resource groups keyed by id, plus the poll tasks feeding them.
//! Request handlers only call [`SamAgent::get_active_resource`]; everything
//! else is lifecycle for the composition root.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ssobroker_core::domain::config::SamConfig;
use ssobroker_core::Clock;

use crate::application::poller::{poll_once, ResourcePoller};
use crate::application::polling_factory::create_polling_method;
use crate::domain::errors::SamError;
use crate::domain::group::{GroupSnapshot, SamResourceGroup};
use crate::domain::polling::PollingMethod;
use crate::domain::resource::SamResource;

struct RegisteredGroup {
    group: Arc<SamResourceGroup>,
    /// Parallel to `group.resources()`.
    methods: Vec<Arc<dyn PollingMethod>>,
}

struct PollerHandle {
    shutdown_token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Pollers {
    started: bool,
    handles: Vec<PollerHandle>,
}

pub struct SamAgent {
    clock: Arc<dyn Clock>,
    /// Registration order, for stable snapshots and poll cycles.
    order: RwLock<Vec<String>>,
    groups: RwLock<HashMap<String, Arc<RegisteredGroup>>>,
    /// Locked before `groups` wherever both are held.
    pollers: Mutex<Pollers>,
}

impl SamAgent {
    /// Empty agent with no groups and no running pollers.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            order: RwLock::new(Vec::new()),
            groups: RwLock::new(HashMap::new()),
            pollers: Mutex::new(Pollers::default()),
        }
    }

    /// Build every configured group and start polling. Must be called inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SamError::Configuration`] if no group is configured, ids clash, or a
    /// polling method cannot be built. Nothing is started in that case.
    pub fn init(config: &SamConfig, clock: Arc<dyn Clock>) -> Result<Self, SamError> {
        let agent = Self::from_config(config, clock)?;
        agent.start();
        Ok(agent)
    }

    /// Same as [`SamAgent::init`] without starting the pollers.
    pub fn from_config(config: &SamConfig, clock: Arc<dyn Clock>) -> Result<Self, SamError> {
        config.validate()?;

        let client = reqwest::Client::new();
        let agent = Self::new(clock);
        for group_config in &config.groups {
            let mut resources = Vec::with_capacity(group_config.resources.len());
            for resource in &group_config.resources {
                let method = create_polling_method(&resource.polling, &client).map_err(|e| {
                    SamError::Configuration(format!("group {} resource {}: {}", group_config.id, resource.id, e))
                })?;
                resources.push((SamResource::new(resource.id.clone(), resource.attributes.clone()), method));
            }
            agent.add_group(group_config.id.clone(), group_config.interval, resources)?;
        }
        Ok(agent)
    }

    /// Register a group. Resources are given in priority order, each with the
    /// method used to poll it. If the agent is already started, the group's
    /// pollers start right away.
    ///
    /// # Errors
    ///
    /// [`SamError::Configuration`] for a duplicate id, a zero interval or an
    /// empty resource list.
    pub fn add_group(
        &self,
        id: impl Into<String>,
        interval: Duration,
        resources: Vec<(SamResource, Arc<dyn PollingMethod>)>,
    ) -> Result<(), SamError> {
        let id = id.into();
        if resources.is_empty() {
            return Err(SamError::Configuration(format!("sam group {id} has no resources")));
        }
        if interval.is_zero() {
            return Err(SamError::Configuration(format!("sam group {id} has a zero interval")));
        }

        let mut pollers = self.pollers.lock();
        let mut groups = self.groups.write();
        if groups.contains_key(&id) {
            return Err(SamError::Configuration(format!("duplicate sam group id: {id}")));
        }

        let (resources, methods): (Vec<_>, Vec<_>) = resources.into_iter().unzip();
        let registered = RegisteredGroup {
            group: Arc::new(SamResourceGroup::new(id.clone(), interval, resources)),
            methods,
        };
        info!(group = %id, resources = registered.methods.len(), "Registered resource group");
        let registered = Arc::new(registered);
        if pollers.started {
            self.spawn_pollers(&registered, &mut pollers.handles);
        }
        groups.insert(id.clone(), registered);
        self.order.write().push(id);
        Ok(())
    }

    /// Spawn one poller per resource. A second call is a no-op.
    pub fn start(&self) {
        let mut pollers = self.pollers.lock();
        if pollers.started {
            return;
        }
        pollers.started = true;

        for registered in self.registered_groups() {
            self.spawn_pollers(&registered, &mut pollers.handles);
        }
        info!(pollers = pollers.handles.len(), "SAM agent started");
    }

    fn spawn_pollers(&self, registered: &RegisteredGroup, handles: &mut Vec<PollerHandle>) {
        for (index, method) in registered.methods.iter().enumerate() {
            let poller = ResourcePoller::new(registered.group.clone(), index, method.clone(), self.clock.clone());
            let shutdown_token = poller.shutdown_token();
            let handle = poller.start();
            handles.push(PollerHandle { shutdown_token, handle });
        }
    }

    /// Poll every resource of every group once, in priority order, and wait
    /// for all outcomes to be recorded.
    pub async fn poll_cycle(&self) {
        for registered in self.registered_groups() {
            for (index, method) in registered.methods.iter().enumerate() {
                poll_once(&registered.group, index, method.as_ref(), self.clock.as_ref()).await;
            }
        }
    }

    /// The resource callers should use for `group_id` right now.
    ///
    /// # Errors
    ///
    /// [`SamError::ResourceGroupUnavailable`] if the group is unknown or none of
    /// its resources is currently up (including before the first poll).
    pub fn get_active_resource(&self, group_id: &str) -> Result<Arc<SamResource>, SamError> {
        let group = self
            .groups
            .read()
            .get(group_id)
            .map(|registered| registered.group.clone())
            .ok_or_else(|| SamError::ResourceGroupUnavailable(format!("unknown group {group_id}")))?;

        group.active_resource().ok_or_else(|| {
            warn!(group = %group_id, "No live resource available");
            SamError::ResourceGroupUnavailable(format!("no live resource in group {group_id}"))
        })
    }

    pub fn group_ids(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Per-group state for monitors, in registration order.
    pub fn snapshot(&self) -> Vec<GroupSnapshot> {
        self.registered_groups()
            .iter()
            .map(|registered| registered.group.snapshot())
            .collect()
    }

    /// Stop all pollers and wait for them to exit. Idempotent.
    pub async fn destroy(&self) {
        let pollers: Vec<PollerHandle> = std::mem::take(&mut *self.pollers.lock()).handles;
        for poller in &pollers {
            poller.shutdown_token.cancel();
        }
        for poller in pollers {
            if let Err(e) = poller.handle.await {
                warn!(error = %e, "Resource poller ended abnormally");
            }
        }
        info!("SAM agent stopped");
    }

    fn registered_groups(&self) -> Vec<Arc<RegisteredGroup>> {
        let groups = self.groups.read();
        self.order
            .read()
            .iter()
            .filter_map(|id| groups.get(id).cloned())
            .collect()
    }
}

impl Drop for SamAgent {
    fn drop(&mut self) {
        for poller in self.pollers.get_mut().handles.drain(..) {
            poller.shutdown_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::polling::PollError;
    use crate::domain::resource::ResourceState;
    use async_trait::async_trait;
    use ssobroker_core::ManualClock;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Switch(AtomicBool);

    impl Switch {
        fn new(up: bool) -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(up)))
        }

        fn set(&self, up: bool) {
            self.0.store(up, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PollingMethod for Switch {
        fn describe(&self) -> String {
            "switch".to_string()
        }

        async fn poll(&self) -> Result<(), PollError> {
            if self.0.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(PollError::Failed("switched off".to_string()))
            }
        }
    }

    fn agent_with(a: Arc<Switch>, b: Arc<Switch>) -> SamAgent {
        let agent = SamAgent::new(Arc::new(ManualClock::new(5)));
        agent
            .add_group(
                "db",
                Duration::from_secs(10),
                vec![
                    (SamResource::new("A", HashMap::new()), a as Arc<dyn PollingMethod>),
                    (SamResource::new("B", HashMap::new()), b as Arc<dyn PollingMethod>),
                ],
            )
            .unwrap();
        agent
    }

    #[tokio::test]
    async fn test_failover_and_recovery() {
        let a = Switch::new(true);
        let b = Switch::new(false);
        let agent = agent_with(a.clone(), b.clone());

        agent.poll_cycle().await;
        assert_eq!(agent.get_active_resource("db").unwrap().id(), "A");

        a.set(false);
        b.set(true);
        agent.poll_cycle().await;
        assert_eq!(agent.get_active_resource("db").unwrap().id(), "B");

        b.set(false);
        agent.poll_cycle().await;
        let err = agent.get_active_resource("db").unwrap_err();
        assert!(matches!(err, SamError::ResourceGroupUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unpolled_group_is_unavailable() {
        let agent = agent_with(Switch::new(true), Switch::new(true));
        assert!(agent.get_active_resource("db").is_err());

        let snapshot = agent.snapshot();
        assert_eq!(snapshot[0].resources[0].state, ResourceState::Unknown);
        assert_eq!(snapshot[0].active, None);
    }

    #[tokio::test]
    async fn test_unknown_group() {
        let agent = agent_with(Switch::new(true), Switch::new(true));
        agent.poll_cycle().await;
        assert!(matches!(
            agent.get_active_resource("ldap"),
            Err(SamError::ResourceGroupUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_and_empty_groups_rejected() {
        let agent = agent_with(Switch::new(true), Switch::new(true));
        let dup = agent.add_group(
            "db",
            Duration::from_secs(1),
            vec![(SamResource::new("C", HashMap::new()), Switch::new(true) as Arc<dyn PollingMethod>)],
        );
        assert!(matches!(dup, Err(SamError::Configuration(_))));
        assert!(matches!(
            agent.add_group("empty", Duration::from_secs(1), Vec::new()),
            Err(SamError::Configuration(_))
        ));
        assert_eq!(agent.group_ids(), vec!["db".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let agent = SamAgent::new(Arc::new(ManualClock::new(0)));
        let result = agent.add_group(
            "db",
            Duration::ZERO,
            vec![(SamResource::new("A", HashMap::new()), Switch::new(true) as Arc<dyn PollingMethod>)],
        );
        assert!(matches!(result, Err(SamError::Configuration(_))));
        assert!(agent.group_ids().is_empty());
    }

    #[tokio::test]
    async fn test_group_added_after_start_is_polled() {
        let agent = SamAgent::new(Arc::new(ManualClock::new(0)));
        agent.start();
        agent
            .add_group(
                "db",
                Duration::from_secs(60),
                vec![(SamResource::new("A", HashMap::new()), Switch::new(true) as Arc<dyn PollingMethod>)],
            )
            .unwrap();

        let mut active = agent.get_active_resource("db");
        for _ in 0..100 {
            if active.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            active = agent.get_active_resource("db");
        }
        assert_eq!(active.unwrap().id(), "A");
        agent.destroy().await;
    }

    #[tokio::test]
    async fn test_init_requires_groups() {
        let result = SamAgent::init(&SamConfig { groups: Vec::new() }, Arc::new(ManualClock::new(0)));
        assert!(matches!(result, Err(SamError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_snapshot_records_last_checked() {
        let agent = agent_with(Switch::new(false), Switch::new(true));
        agent.poll_cycle().await;

        let group = &agent.snapshot()[0];
        assert_eq!(group.active.as_deref(), Some("B"));
        assert_eq!(group.resources[0].state, ResourceState::Down);
        assert_eq!(group.resources[0].last_checked, Some(5));
    }
}
