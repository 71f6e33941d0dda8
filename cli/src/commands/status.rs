// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `ssobroker status` - monitor snapshot of the configured stores
//!
//! Connects to the configured backends without starting background tasks,
//! polls every SAM resource once, and prints what it sees. Entries are left
//! untouched.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use ssobroker_core::application::monitor::{session_view, ticket_view};
use ssobroker_core::application::StoreView;
use ssobroker_core::domain::config::BrokerConfigManifest;
use ssobroker_sam::{GroupSnapshot, ResourceState};

use crate::runtime::Broker;

#[derive(Args)]
pub struct StatusArgs {
    /// Print as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
pub struct StatusReport {
    pub sessions: StoreView,
    pub tickets: StoreView,
    pub sam: Vec<GroupSnapshot>,
}

pub async fn execute(args: StatusArgs, config_path: Option<PathBuf>) -> Result<()> {
    let manifest = BrokerConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    let broker = Broker::inspect(&manifest).await?;
    let report = collect(&broker).await;
    broker.detach().await;
    let report = report?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.sessions.render_table());
        println!();
        print!("{}", report.tickets.render_table());
        println!();
        print_sam(&report.sam);
    }
    Ok(())
}

pub async fn collect(broker: &Broker) -> Result<StatusReport> {
    let sessions = session_view(&broker.sessions).await?;
    let tickets = ticket_view(&broker.tickets).await?;
    let sam = match &broker.sam {
        Some(agent) => {
            agent.poll_cycle().await;
            agent.snapshot()
        }
        None => Vec::new(),
    };
    Ok(StatusReport { sessions, tickets, sam })
}

fn print_sam(groups: &[GroupSnapshot]) {
    println!("{}", "Resource groups:".bold());
    if groups.is_empty() {
        println!("  {}", "(none configured)".dimmed());
        return;
    }
    for group in groups {
        let active = match &group.active {
            Some(id) => id.green().to_string(),
            None => "unavailable".red().to_string(),
        };
        println!("  {} -> {}", group.id.bold(), active);
        for resource in &group.resources {
            let state = match resource.state {
                ResourceState::Up => "up".green(),
                ResourceState::Down => "down".red(),
                ResourceState::Unknown => "unknown".yellow(),
            };
            println!("    {:<20} {}", resource.id, state);
        }
    }
}
