// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use ssobroker_core::domain::config::{BackendConfig, BrokerConfigManifest, PollingConfig, StoreConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./ssobroker-config.yaml)
        #[arg(short, long, default_value = "./ssobroker-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = BrokerConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. SSOBROKER_CONFIG_PATH: {}",
            std::env::var("SSOBROKER_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./ssobroker-config.yaml");
        println!("  4. ~/.ssobroker/config.yaml");
        println!("  5. /etc/ssobroker/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    print_store("Sessions:", &config.spec.sessions);
    print_store("Tickets:", &config.spec.tickets);

    println!("{}", "Resource groups:".bold());
    match &config.spec.sam {
        Some(sam) => {
            for group in &sam.groups {
                println!("  {} (every {:?})", group.id.bold(), group.interval);
                for resource in &group.resources {
                    println!("    - {} via {}", resource.id, describe_polling(&resource.polling));
                }
            }
        }
        None => println!("  {}", "(none)".dimmed()),
    }
    println!();

    Ok(())
}

fn print_store(title: &str, store: &StoreConfig) {
    println!("{}", title.bold());
    println!(
        "  Max entries: {}",
        store.max.map_or_else(|| "unbounded".to_string(), |m| m.to_string())
    );
    println!("  Expire: {:?}", store.expire);
    match store.interval {
        Some(interval) => println!("  Sweep interval: {:?}", interval),
        None => println!("  Sweep interval: {}", "(disabled)".dimmed()),
    }
    match &store.backend {
        BackendConfig::Memory => println!("  Backend: memory"),
        BackendConfig::Postgres { table, max_connections, .. } => {
            println!("  Backend: postgres (table {}, pool {})", table, max_connections)
        }
    }
    println!();
}

fn describe_polling(polling: &PollingConfig) -> String {
    match polling {
        PollingConfig::Http { url, .. } => format!("http {url}"),
        PollingConfig::Tcp { address, .. } => format!("tcp {address}"),
        PollingConfig::Postgres { .. } => "postgres".to_string(),
    }
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = BrokerConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
