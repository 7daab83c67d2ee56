// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated geographic position
//!
//! The position follows a random walk: each step moves latitude and
//! longitude by an independent uniform delta in `[-step, step]`. No bounds
//! are applied, the simulated device may drift anywhere.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default random walk bound, in degrees
pub const DEFAULT_GEO_STEP: f64 = 0.01;

/// Encoded width of a position without altitude
pub const POSITION_BYTES: usize = 16;

/// Encoded width of a position with altitude
pub const POSITION_WITH_ALTITUDE_BYTES: usize = 24;

/// A latitude/longitude pair with an optional altitude.
///
/// This is also the format of the device reference file:
///
/// ```json
/// { "latitude": 40.4168, "longitude": -3.7038, "altitude": 667.0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
        }
    }

    /// Uniformly distributed position anywhere on the globe
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::new(
            rng.random_range(-90.0..=90.0),
            rng.random_range(-180.0..=180.0),
        )
    }
}

/// Random walk position generator
#[derive(Debug, Clone)]
pub struct GeoSimulator {
    position: GeoPosition,
    step: f64,
}

impl GeoSimulator {
    /// Start walking from `position`, moving at most `step` degrees per tick
    /// on each axis.
    pub fn new(position: GeoPosition, step: f64) -> Self {
        Self {
            position,
            step: step.abs(),
        }
    }

    /// Start from a random point of the globe
    pub fn random<R: Rng>(step: f64, rng: &mut R) -> Self {
        Self::new(GeoPosition::random(rng), step)
    }

    /// Start from the reference point stored in a device file.
    ///
    /// Falls back to a random starting point if the file is missing or does
    /// not hold a valid position.
    pub fn from_reference_file<P: AsRef<Path>, R: Rng>(
        path: P,
        step: f64,
        rng: &mut R,
    ) -> Self {
        let path = path.as_ref();
        let loaded = fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                serde_json::from_slice::<GeoPosition>(&bytes).map_err(|e| e.to_string())
            });

        match loaded {
            Ok(position) => {
                debug!(
                    "Loaded reference position {}, {} from {}",
                    position.latitude,
                    position.longitude,
                    path.display()
                );
                Self::new(position, step)
            }
            Err(e) => {
                warn!(
                    "No usable reference position in {} ({}), starting from a random point",
                    path.display(),
                    e
                );
                Self::random(step, rng)
            }
        }
    }

    /// Position the next frame will report
    pub fn current_position(&self) -> GeoPosition {
        self.position
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Move one random walk step
    pub fn advance<R: Rng>(&mut self, rng: &mut R) {
        if self.step == 0.0 || !self.step.is_finite() {
            return;
        }
        self.position.latitude += rng.random_range(-self.step..=self.step);
        self.position.longitude += rng.random_range(-self.step..=self.step);
    }

    /// Serialize a position as big-endian `f64` values: latitude, longitude
    /// and, when requested, altitude.
    pub fn encode(position: &GeoPosition, include_altitude: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(if include_altitude {
            POSITION_WITH_ALTITUDE_BYTES
        } else {
            POSITION_BYTES
        });
        out.extend_from_slice(&position.latitude.to_be_bytes());
        out.extend_from_slice(&position.longitude.to_be_bytes());
        if include_altitude {
            out.extend_from_slice(&position.altitude.to_be_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Write;

    #[test]
    fn test_advance_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut geo = GeoSimulator::new(GeoPosition::new(40.0, -3.0), 0.01);
        for _ in 0..1000 {
            let before = geo.current_position();
            geo.advance(&mut rng);
            let after = geo.current_position();
            assert!((after.latitude - before.latitude).abs() <= 0.01);
            assert!((after.longitude - before.longitude).abs() <= 0.01);
        }
    }

    #[test]
    fn test_current_position_has_no_side_effect() {
        let geo = GeoSimulator::new(GeoPosition::new(1.5, 2.5), 0.01);
        assert_eq!(geo.current_position(), geo.current_position());
    }

    #[test]
    fn test_encode_without_altitude() {
        let position = GeoPosition {
            latitude: 40.5,
            longitude: -3.25,
            altitude: 650.0,
        };
        let bytes = GeoSimulator::encode(&position, false);
        assert_eq!(bytes.len(), POSITION_BYTES);

        let latitude = f64::from_be_bytes(bytes[0..8].try_into().unwrap());
        let longitude = f64::from_be_bytes(bytes[8..16].try_into().unwrap());
        assert_relative_eq!(latitude, 40.5);
        assert_relative_eq!(longitude, -3.25);
    }

    #[test]
    fn test_encode_with_altitude() {
        let position = GeoPosition {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 650.0,
        };
        let bytes = GeoSimulator::encode(&position, true);
        assert_eq!(bytes.len(), POSITION_WITH_ALTITUDE_BYTES);
        let altitude = f64::from_be_bytes(bytes[16..24].try_into().unwrap());
        assert_relative_eq!(altitude, 650.0);
    }

    #[test]
    fn test_reference_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"latitude": 48.85, "longitude": 2.35}}"#).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let geo = GeoSimulator::from_reference_file(file.path(), 0.01, &mut rng);
        assert_relative_eq!(geo.current_position().latitude, 48.85);
        assert_relative_eq!(geo.current_position().longitude, 2.35);
        assert_relative_eq!(geo.current_position().altitude, 0.0);
    }

    #[test]
    fn test_missing_reference_file_uses_random_point() {
        let mut rng = StdRng::seed_from_u64(1);
        let geo = GeoSimulator::from_reference_file("/nonexistent/device.json", 0.01, &mut rng);
        let position = geo.current_position();
        assert!((-90.0..=90.0).contains(&position.latitude));
        assert!((-180.0..=180.0).contains(&position.longitude));
    }
}
