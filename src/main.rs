// MIT License - Copyright (c) 2021 TJForc
// Command line client for an Elk M1XEP

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};

use elk_m1_bridge::registry::{self, Capability, Operation};
use elk_m1_bridge::{Credentials, ElkPanel, M1Config, StaticCredentials, ZoneCondition};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "elkm1")]
#[command(about = "Query an Elk M1 panel through its M1XEP Ethernet module")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Get the current time from the M1XEP
    Gettime,
    /// Get the names of all zones
    Zonenames,
    /// Get the status of all zones
    Zonestatus,
    /// Evaluate a zone condition (normal, violated, trouble, bypassed)
    Condition {
        /// Condition name
        name: String,
        /// Zone number (1-208)
        #[arg(long)]
        zone: u32,
    },
    /// List the operations and conditions supported
    List,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: M1Config,
    #[serde(default)]
    credentials: HashMap<String, Credentials>,
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {path}"))?;
    let config: Config = toml::from_str(&text).context("Failed to parse config file")?;
    config
        .panel
        .validate()
        .context("Invalid [panel] configuration")?;
    Ok(config)
}

fn list_capabilities(out: &mut impl Write) -> Result<()> {
    for capability in [Capability::Controller, Capability::Device] {
        writeln!(out, "{}:", capability.type_name())?;
        for (name, help) in capability.operations() {
            writeln!(out, "  operation {name:<12} {help}")?;
        }
        for (name, help) in capability.conditions() {
            writeln!(out, "  condition {name:<12} {help}")?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG controls verbosity (e.g. RUST_LOG=elk_m1_bridge=trace).
    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();

    if let Cmd::List = cli.command {
        return list_capabilities(&mut stdout);
    }

    let config = load_config(&cli.config)?;
    let credentials = StaticCredentials::from(config.credentials);
    debug!("Panel configuration: {:?}", config.panel);

    let panel = ElkPanel::from_config(&config.panel, &credentials)
        .context("Failed to set up panel connection")?;
    info!("Using panel at {}", config.panel.address);

    let result = match &cli.command {
        Cmd::Gettime => Operation::GetTime.execute(&panel, &mut stdout, cli.json).await,
        Cmd::Zonenames => Operation::ZoneNames.execute(&panel, &mut stdout, cli.json).await,
        Cmd::Zonestatus => Operation::ZoneStatus.execute(&panel, &mut stdout, cli.json).await,
        Cmd::Condition { name, zone } => {
            let condition = ZoneCondition::from_name(name).with_context(|| {
                format!("Unknown condition {name:?} for {}", registry::ZONE_DEVICE_TYPE)
            })?;
            registry::evaluate(&panel, *zone, condition, &mut stdout, cli.json)
                .await
                .map(|_| ())
        }
        Cmd::List => Ok(()),
    };

    if let Err(e) = panel.close().await {
        debug!("Error closing panel connection: {}", e);
    }
    result.with_context(|| format!("Operation failed against {}", config.panel.address))
}
