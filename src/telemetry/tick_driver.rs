// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic telemetry refresh
//!
//! The tick driver owns the simulated time (counters, geo position and the
//! random source) and writes one frame into the register store per tick.
//! It runs on a single task, so its state needs no locking; only the
//! register store is shared with the connection tasks.

use std::sync::Arc;

use log::{debug, warn};
use rand::{rngs::StdRng, Rng};

use super::encoder::{SimulatedCounters, TelemetryEncoder};
use super::geo::GeoSimulator;
use crate::error::SimulatorError;
use crate::modbus::RegisterStore;

pub struct TickDriver<R: Rng = StdRng> {
    store: Arc<RegisterStore>,
    encoder: TelemetryEncoder,
    counters: SimulatedCounters,
    geo: GeoSimulator,
    base_address: usize,
    rng: R,
}

impl<R: Rng> TickDriver<R> {
    pub fn new(
        store: Arc<RegisterStore>,
        encoder: TelemetryEncoder,
        geo: GeoSimulator,
        base_address: usize,
        rng: R,
    ) -> Self {
        Self {
            store,
            encoder,
            counters: SimulatedCounters::default(),
            geo,
            base_address,
            rng,
        }
    }

    /// Replace the simulated counters, e.g. to resume from a known state
    pub fn with_counters(mut self, counters: SimulatedCounters) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> SimulatedCounters {
        self.counters
    }

    pub fn geo(&self) -> &GeoSimulator {
        &self.geo
    }

    /// Encode the next frame and write it at the base address.
    ///
    /// Simulated time advances even when the write is rejected.
    ///
    /// ### Errors
    ///
    /// `SimulatorError::OutOfRange` if the frame does not fit in the store.
    pub fn tick(&mut self) -> Result<Vec<u16>, SimulatorError> {
        let words = self
            .encoder
            .tick(&mut self.counters, &mut self.geo, &mut self.rng);
        self.store.write(self.base_address, &words)?;
        debug!(
            "Tick {}: wrote {} registers at {}",
            self.counters.elapsed_ticks,
            words.len(),
            self.base_address
        );
        Ok(words)
    }

    /// Like [`TickDriver::tick`] but logs failures instead of returning them
    pub fn tick_logged(&mut self) {
        if let Err(e) = self.tick() {
            warn!("Telemetry frame not written: {}", e);
        }
    }
}
