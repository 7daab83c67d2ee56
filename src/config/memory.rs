// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register memory configuration

use serde::{Deserialize, Serialize};

/// Initial content of the holding registers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Path to a JSON snapshot: an array of 16-bit values, one per register.
    ///
    /// The snapshot length becomes the number of registers. Without a
    /// snapshot, or if it cannot be loaded, the full 65536 register space is
    /// served, zero-filled.
    #[serde(default)]
    pub snapshot: Option<String>,
}
