// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the structures for configuring the Modbus TCP listener
//! of the simulated slave.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// # Example
///
/// ```
/// use rust_modsim::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 5020,
///     address: "127.0.0.1".to_string(),
///     custom_function_code: Some(0x41),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus server.
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    pub address: String,

    /// Function code answered by the custom read handler.
    ///
    /// Disabled when absent. The code must be one that the protocol engine
    /// does not decode itself (see `RESERVED_FUNCTION_CODES`).
    #[serde(default)]
    pub custom_function_code: Option<u8>,
}

/// Function codes decoded natively by the Modbus engine; they cannot be
/// routed to the custom read handler.
pub const RESERVED_FUNCTION_CODES: [u8; 12] =
    [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0F, 0x10, 0x11, 0x16, 0x17, 0x2B];

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 40102,
            address: "0.0.0.0".to_string(),
            custom_function_code: None,
        }
    }
}
