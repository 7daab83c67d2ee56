// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the Modbus simulator
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `modbus`: Settings for the Modbus TCP listener
//! - `memory`: Initial content of the holding registers
//! - `simulation`: Periodic telemetry frame settings
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modsim::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(5020),                     // Modbus port
//!     Some("127.0.0.1".to_string()),  // Modbus address
//!     Some("memory.json".into()),     // Register snapshot
//!     Some(500),                      // Tick in milliseconds
//!     None,                           // Device profile
//!     None,                           // Custom function code
//! );
//!
//! println!("Modbus port: {}", config.modbus.port);
//! ```

pub mod memory;
pub mod modbus;
pub mod simulation;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::telemetry::DeviceProfile;

pub use memory::MemoryConfig;
pub use modbus::{ModbusConfig, RESERVED_FUNCTION_CODES};
pub use simulation::SimulationConfig;
pub use utils::{is_valid_ip_address, output_config_schema, validate_specific_rules};

/// Embedded JSON schema used to validate configuration files
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure of the simulator.
///
/// Every section uses default values when not explicitly specified in the
/// configuration file, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the Modbus TCP listener.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Initial content of the holding registers.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Periodic telemetry frame settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file failing schema
    /// validation, deserialization or the additional rules is rejected and a
    /// `*.sample.yaml` file with default values is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml_str(&contents).inspect_err(|_| {
            if let Err(e) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {}", e);
            }
        })
    }

    /// Parse and validate a YAML configuration document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document is a valid configuration with all defaults
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = serde_yml::from_str(contents)
            .map_err(|err| anyhow::anyhow!("Failed to deserialize configuration: {}", err))?;

        validate_specific_rules(&config)?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `modbus_port` - TCP port of the Modbus listener
    /// * `modbus_address` - Network address of the Modbus listener
    /// * `snapshot` - Register snapshot file
    /// * `tick_ms` - Milliseconds between telemetry frames, `0` disables them
    /// * `profile` - Simulated device class
    /// * `custom_function_code` - Function code routed to the custom read handler
    pub fn apply_args(
        &mut self,
        modbus_port: Option<u16>,
        modbus_address: Option<String>,
        snapshot: Option<PathBuf>,
        tick_ms: Option<u64>,
        profile: Option<DeviceProfile>,
        custom_function_code: Option<u8>,
    ) {
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }
        if let Some(snapshot) = snapshot {
            debug!("Overriding register snapshot from command line: {:?}", snapshot);
            self.memory.snapshot = Some(snapshot.to_string_lossy().to_string());
        }
        if let Some(tick_ms) = tick_ms {
            debug!("Overriding tick from command line: {} ms", tick_ms);
            self.simulation.tick_ms = tick_ms;
        }
        if let Some(profile) = profile {
            debug!("Overriding device profile from command line: {}", profile);
            self.simulation.profile = profile;
        }
        if let Some(code) = custom_function_code {
            debug!("Overriding custom function code from command line: {}", code);
            self.modbus.custom_function_code = Some(code);
        }
    }
}
