// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use thiserror::Error;
use tokio_modbus::prelude::ExceptionCode;

/// Errors raised by the simulator core
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Register range {address}..{address}+{count} exceeds capacity {capacity}")]
    OutOfRange {
        address: usize,
        count: usize,
        capacity: usize,
    },

    #[error("Invalid register snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Unable to bind Modbus listener on {address}: {source}")]
    ListenerFailure {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl SimulatorError {
    /// Modbus exception reported to the master for this error.
    ///
    /// Only `OutOfRange` can happen on a request path; startup errors have
    /// no protocol-level equivalent.
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            SimulatorError::OutOfRange { .. } => Some(ExceptionCode::IllegalDataAddress),
            SimulatorError::InvalidSnapshot { .. } | SimulatorError::ListenerFailure { .. } => None,
        }
    }
}
