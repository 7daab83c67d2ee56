// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module holds the register memory of the simulated slave and the
//! Modbus TCP service answering the master under test.
//!
//! ## Key Components
//!
//! - `RegisterStore`: bounds-checked, lock-protected holding registers
//! - `handle_read`: custom read handler returning a byte-count prefixed buffer
//! - `SimulatorModbusServer`: the `tokio-modbus` service
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_modsim::modbus::{RegisterStore, SimulatorModbusServer};
//!
//! let store = Arc::new(RegisterStore::default());
//! let service = SimulatorModbusServer::new(store.clone());
//! ```

pub mod modbus_server;
pub mod read_handler;
pub mod register_store;

pub use modbus_server::SimulatorModbusServer;
pub use read_handler::{handle_read, ReadResponse, ReadStatus};
pub use register_store::{RegisterStore, DEFAULT_CAPACITY};
