// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the Modbus TCP slave simulator
use anyhow::Result;
use clap::Parser;
use log::info;
use rust_modsim::config::{self, Config};
use rust_modsim::daemon::Daemon;
use rust_modsim::telemetry::DeviceProfile;

use std::path::PathBuf;
use tokio::signal;

/// Modbus TCP slave simulator serving synthetic telemetry
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Modbus listening port (default: 40102)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Modbus listening address (default: 0.0.0.0)
    #[arg(long)]
    address: Option<String>,

    /// JSON array of register values loaded at startup
    #[arg(long = "mem", value_name = "SNAPSHOT")]
    mem: Option<PathBuf>,

    /// Milliseconds between telemetry frames, 0 disables them
    #[arg(short = 't', long = "tick", value_name = "MS")]
    tick: Option<u64>,

    /// Simulated device class: station or device
    #[arg(long)]
    profile: Option<DeviceProfile>,

    /// Function code answered by the custom read handler
    #[arg(long)]
    custom_function_code: Option<u8>,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port,
        args.address.clone(),
        args.mem.clone(),
        args.tick,
        args.profile,
        args.custom_function_code,
    );
    // Overrides bypass the schema, check them again
    config::validate_specific_rules(&config)?;

    info!("Starting Modbus simulator");
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}
