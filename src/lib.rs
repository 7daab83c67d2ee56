// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Modbus simulator library
//!
//! This library implements a Modbus TCP slave exposing a bank of holding
//! registers, refreshed periodically with synthetic telemetry frames of a
//! station or a mobile device.

pub mod config;
pub mod daemon;
pub mod error;
pub mod modbus;
pub mod telemetry;

pub use error::SimulatorError;
