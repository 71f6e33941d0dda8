// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! - [`SamAgent`] - owns every resource group and its poll tasks
//! - [`poller`] - one supervised poll loop per resource
//! - [`polling_factory`] - builds probes from configuration

pub mod agent;
pub mod poller;
pub mod polling_factory;

pub use agent::SamAgent;
pub use poller::ResourcePoller;
pub use polling_factory::create_polling_method;
