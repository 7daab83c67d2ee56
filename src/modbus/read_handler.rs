// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Custom register read handler
//!
//! Answers a read request expressed as a start register and a *byte*
//! count. The response buffer is `count + 1` bytes long: byte 0 echoes the
//! count, then `count / 2` registers follow, big-endian, two bytes each.
//!
//! The handler is independent from the Modbus service so it can be driven
//! directly; the service only routes a configured custom function code here.

use log::{debug, error};
use tokio_modbus::prelude::ExceptionCode;

use super::register_store::RegisterStore;

/// Outcome of a custom read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Success,
    /// The requested range does not fit in the register store
    IllegalDataAddress,
    /// The byte count cannot be echoed in the one-byte count field
    IllegalDataValue,
}

impl ReadStatus {
    /// Modbus exception to send back, `None` on success
    pub fn exception(&self) -> Option<ExceptionCode> {
        match self {
            ReadStatus::Success => None,
            ReadStatus::IllegalDataAddress => Some(ExceptionCode::IllegalDataAddress),
            ReadStatus::IllegalDataValue => Some(ExceptionCode::IllegalDataValue),
        }
    }
}

/// Response buffer and status produced by [`handle_read`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub data: Vec<u8>,
    pub status: ReadStatus,
}

/// Serve `count` bytes of holding registers starting at register `address`.
///
/// The request is accepted when `address + ceil(count / 2)` fits in the
/// store. On failure the buffer keeps its `count + 1` shape with only the
/// count byte set, and the status carries the exception to report.
pub fn handle_read(store: &RegisterStore, address: u16, count: u16) -> ReadResponse {
    let byte_count = usize::from(count);
    let mut data = vec![0u8; byte_count + 1];

    let Ok(count_byte) = u8::try_from(count) else {
        error!(
            "Exception::IllegalDataValue - byte count {} does not fit the count field",
            count
        );
        return ReadResponse {
            data,
            status: ReadStatus::IllegalDataValue,
        };
    };
    data[0] = count_byte;

    let start = usize::from(address);
    let needed = byte_count.div_ceil(2);
    if start + needed > store.capacity() {
        error!(
            "Exception::IllegalDataAddress - reading {} bytes from register {}",
            count, address
        );
        return ReadResponse {
            data,
            status: ReadStatus::IllegalDataAddress,
        };
    }

    // Odd byte counts leave the last byte at zero.
    let registers = match store.read(start, byte_count / 2) {
        Ok(registers) => registers,
        Err(e) => {
            error!("Exception::IllegalDataAddress - {}", e);
            return ReadResponse {
                data,
                status: ReadStatus::IllegalDataAddress,
            };
        }
    };
    for (chunk, value) in data[1..].chunks_exact_mut(2).zip(&registers) {
        chunk.copy_from_slice(&value.to_be_bytes());
    }

    debug!("Reading address {} reading {} bytes", address, count);
    ReadResponse {
        data,
        status: ReadStatus::Success,
    }
}
