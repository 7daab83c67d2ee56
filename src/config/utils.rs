// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA, RESERVED_FUNCTION_CODES};
use crate::modbus::DEFAULT_CAPACITY;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_modsim --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Listener address**: must be an IP address or `localhost`
/// - **Custom function code**: must be a public function code (1-127) not
///   already decoded by the Modbus engine
/// - **Geo step**: must be a finite, non-negative number
/// - **Frame placement**: a frame starting at `base_address` must fit in the
///   full register space (a smaller snapshot is only known at runtime)
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if !is_valid_ip_address(&config.modbus.address) {
        anyhow::bail!("Invalid Modbus address: {}", config.modbus.address);
    }

    if let Some(code) = config.modbus.custom_function_code {
        if code == 0 || code > 0x7F {
            anyhow::bail!("Invalid custom function code: {}", code);
        }
        if RESERVED_FUNCTION_CODES.contains(&code) {
            anyhow::bail!(
                "Custom function code {} is already handled by the Modbus server",
                code
            );
        }
    }

    let step = config.simulation.geo_step;
    if !step.is_finite() || step < 0.0 {
        anyhow::bail!("Invalid geo step: {}", step);
    }

    let frame_end =
        usize::from(config.simulation.base_address) + config.simulation.profile.register_count();
    if frame_end > DEFAULT_CAPACITY {
        anyhow::bail!(
            "A {} frame at register {} does not fit in the register space",
            config.simulation.profile,
            config.simulation.base_address
        );
    }

    if config.modbus.port == 0 {
        warn!("Modbus port 0 lets the system pick a random port");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DeviceProfile;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_ip_addresses() {
        assert!(is_valid_ip_address("127.0.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("not an address"));
    }

    #[test]
    fn test_reserved_function_code_rejected() {
        let mut config = Config::default();
        config.modbus.custom_function_code = Some(0x03);
        assert!(validate_specific_rules(&config).is_err());

        config.modbus.custom_function_code = Some(0x80);
        assert!(validate_specific_rules(&config).is_err());

        config.modbus.custom_function_code = Some(0x41);
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_frame_must_fit() {
        let mut config = Config::default();
        config.simulation.profile = DeviceProfile::Station;
        config.simulation.base_address = 65516;
        assert!(validate_specific_rules(&config).is_ok());
        config.simulation.base_address = 65517;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_invalid_geo_step() {
        let mut config = Config::default();
        config.simulation.geo_step = f64::NAN;
        assert!(validate_specific_rules(&config).is_err());
        config.simulation.geo_step = -0.5;
        assert!(validate_specific_rules(&config).is_err());
        // A zero step freezes the position
        config.simulation.geo_step = 0.0;
        assert!(validate_specific_rules(&config).is_ok());
    }
}
