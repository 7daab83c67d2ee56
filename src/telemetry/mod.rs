// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Synthetic telemetry
//!
//! This module generates the readings of the simulated equipment and lays
//! them out as holding register frames.
//!
//! ## Key Components
//!
//! - `GeoSimulator`: random walk of the device position
//! - `TelemetryEncoder`: builds the station or device frame of a tick
//! - `TickDriver`: owns the simulated time and writes frames into the
//!   register store

pub mod encoder;
pub mod geo;
pub mod tick_driver;

pub use encoder::{
    DeviceProfile, DeviceReading, SimulatedCounters, StationReading, TelemetryEncoder,
};
pub use geo::{GeoPosition, GeoSimulator};
pub use tick_driver::TickDriver;
