// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SSO Broker CLI
//!
//! The `ssobroker` binary hosts the broker core: the session and ticket stores
//! and the SAM resource agent.
//!
//! ## Commands
//!
//! - `ssobroker serve` - run until Ctrl+C / SIGTERM
//! - `ssobroker status [--json]` - snapshot of stores and resource groups
//! - `ssobroker config show|validate|generate` - configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ssobroker_cli::commands::{self, ConfigCommand, StatusArgs};
use ssobroker_cli::logging::{init_logging, LogSettings};
use ssobroker_core::domain::config::BrokerConfigManifest;

/// SSO broker - session, ticket and resource management
#[derive(Parser)]
#[command(name = "ssobroker")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "SSOBROKER_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: config file, then info]
    #[arg(long, global = true, env = "SSOBROKER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (text, json) [default: config file, then text]
    #[arg(long, global = true, env = "SSOBROKER_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the broker until interrupted
    #[command(name = "serve")]
    Serve,

    /// Print a snapshot of the stores and resource groups
    #[command(name = "status")]
    Status(StatusArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load errors surface again, with context, once the command loads the manifest.
    let manifest = match (&cli.log_level, &cli.log_format) {
        (Some(_), Some(_)) => None,
        _ => BrokerConfigManifest::load_or_default(cli.config.clone()).ok(),
    };
    init_logging(&LogSettings::resolve(
        cli.log_level.clone(),
        cli.log_format.clone(),
        manifest.as_ref(),
    ))?;

    match cli.command {
        Commands::Serve => commands::serve::execute(cli.config).await,
        Commands::Status(args) => commands::status::execute(args, cli.config).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}
