// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry simulation configuration
//!
//! This module defines how often synthetic telemetry is written to the
//! holding registers and which device class is simulated.

use serde::{Deserialize, Serialize};

use crate::telemetry::geo::DEFAULT_GEO_STEP;
use crate::telemetry::DeviceProfile;

/// Configuration for the periodic telemetry frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Flag to enable or disable the periodic frame update.
    pub enabled: bool,

    /// Time in milliseconds between two frames.
    ///
    /// A value of zero disables the update, like `enabled: false`.
    pub tick_ms: u64,

    /// Simulated device class: `station` or `device`.
    #[serde(default)]
    pub profile: DeviceProfile,

    /// First holding register of the frame.
    #[serde(default)]
    pub base_address: u16,

    /// Maximum position change per tick, in degrees, on each axis.
    pub geo_step: f64,

    /// JSON file holding the initial position of the device.
    ///
    /// A random position is used when the file is missing.
    pub reference_file: String,
}

impl SimulationConfig {
    /// Whether the tick driver should run
    pub fn is_active(&self) -> bool {
        self.enabled && self.tick_ms > 0
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_ms: 1000,
            profile: DeviceProfile::default(),
            base_address: 0,
            geo_step: DEFAULT_GEO_STEP,
            reference_file: "device.json".to_string(),
        }
    }
}
