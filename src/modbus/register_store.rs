// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Holding register memory of the simulated slave
//!
//! The store is a fixed-capacity array of 16-bit registers protected by a
//! single mutex. The tick driver writes whole telemetry frames while
//! connection tasks read ranges, so both operations take the lock for the
//! full range: a reader never observes a half-written frame.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::error::SimulatorError;

/// Capacity of the store when no snapshot is loaded: the full Modbus
/// address space.
pub const DEFAULT_CAPACITY: usize = 65536;

/// Thread-safe, bounds-checked holding register array.
///
/// The capacity is fixed at construction. Callers only get copies of the
/// register values, never the backing vector.
#[derive(Debug)]
pub struct RegisterStore {
    registers: Mutex<Vec<u16>>,
}

impl Default for RegisterStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RegisterStore {
    /// Create a zero-filled store holding `capacity` registers
    pub fn new(capacity: usize) -> Self {
        Self::from_values(vec![0; capacity])
    }

    /// Create a store whose capacity and content are `values`
    pub fn from_values(values: Vec<u16>) -> Self {
        Self {
            registers: Mutex::new(values),
        }
    }

    /// Decode a JSON snapshot (array of integers, one per register).
    ///
    /// ### Errors
    ///
    /// Returns `SimulatorError::InvalidSnapshot` if the document is not a JSON
    /// array of non-negative integers, if it is empty, or if any value does
    /// not fit in 16 bits.
    pub fn load_snapshot(bytes: &[u8]) -> Result<Self, SimulatorError> {
        let raw: Vec<u64> =
            serde_json::from_slice(bytes).map_err(|e| SimulatorError::InvalidSnapshot {
                reason: e.to_string(),
            })?;

        if raw.is_empty() {
            return Err(SimulatorError::InvalidSnapshot {
                reason: "snapshot contains no registers".to_string(),
            });
        }

        let values = raw
            .iter()
            .enumerate()
            .map(|(index, value)| {
                u16::try_from(*value).map_err(|_| SimulatorError::InvalidSnapshot {
                    reason: format!("register {} holds {} which exceeds 16 bits", index, value),
                })
            })
            .collect::<Result<Vec<u16>, _>>()?;

        debug!("Loaded register snapshot with {} registers", values.len());
        Ok(Self::from_values(values))
    }

    /// Decode a snapshot, falling back to a zero-filled full-range store.
    pub fn from_snapshot_or_default(bytes: &[u8]) -> Self {
        match Self::load_snapshot(bytes) {
            Ok(store) => store,
            Err(e) => {
                warn!("{}, using {} zeroed registers", e, DEFAULT_CAPACITY);
                Self::default()
            }
        }
    }

    /// Read and decode a snapshot file.
    ///
    /// An unreadable file is reported as `InvalidSnapshot`, like a malformed one.
    pub fn load_snapshot_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| SimulatorError::InvalidSnapshot {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::load_snapshot(&bytes)
    }

    /// Read a snapshot file, falling back to a zero-filled full-range store.
    pub fn from_snapshot_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_snapshot_file(path) {
            Ok(store) => store,
            Err(e) => {
                warn!("{}, using {} zeroed registers", e, DEFAULT_CAPACITY);
                Self::default()
            }
        }
    }

    /// Number of registers in the store
    pub fn capacity(&self) -> usize {
        self.lock().len()
    }

    /// Copy `count` registers starting at `address`.
    ///
    /// ### Errors
    ///
    /// `SimulatorError::OutOfRange` when `address + count` exceeds the capacity.
    pub fn read(&self, address: usize, count: usize) -> Result<Vec<u16>, SimulatorError> {
        let registers = self.lock();
        let range = checked_range(address, count, registers.len())?;
        Ok(registers[range].to_vec())
    }

    /// Overwrite registers starting at `address` with `values`.
    ///
    /// The range is checked before anything is written, so a failing write
    /// leaves the store untouched.
    ///
    /// ### Errors
    ///
    /// `SimulatorError::OutOfRange` when `address + values.len()` exceeds the capacity.
    pub fn write(&self, address: usize, values: &[u16]) -> Result<(), SimulatorError> {
        let mut registers = self.lock();
        let range = checked_range(address, values.len(), registers.len())?;
        registers[range].copy_from_slice(values);
        Ok(())
    }

    /// A panic while holding the lock cannot leave the registers in an
    /// invalid state (every write is a single `copy_from_slice`), so a
    /// poisoned mutex is recovered.
    fn lock(&self) -> MutexGuard<'_, Vec<u16>> {
        self.registers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn checked_range(
    address: usize,
    count: usize,
    capacity: usize,
) -> Result<std::ops::Range<usize>, SimulatorError> {
    match address.checked_add(count) {
        Some(end) if end <= capacity => Ok(address..end),
        _ => Err(SimulatorError::OutOfRange {
            address,
            count,
            capacity,
        }),
    }
}
