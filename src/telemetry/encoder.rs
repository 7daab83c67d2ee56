// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry frame encoder
//!
//! Each tick produces one fixed-layout frame for the selected device class.
//! All multi-byte fields are big-endian and the frame is written to the
//! holding registers as big-endian word pairs.
//!
//! ## Station frame (40 bytes, 20 registers)
//!
//! | Bytes  | Register | Field                       | Type    | Range      |
//! |--------|----------|-----------------------------|---------|------------|
//! | 0-1    | 0        | Connection status           | u16     | 0 or 1     |
//! | 2-3    | 1        | Message counter             | u16     | wrapping   |
//! | 4-5    | 2        | Connected devices           | u16     | 17-23      |
//! | 6-7    | 3        | Signal strength             | u16     | 70-87      |
//! | 8-15   | 4-7      | Link quality                | f64     | -70..-40   |
//! | 16-39  | 8-19     | Reserved (zero)             |         |            |
//!
//! ## Device frame (22 bytes, 11 registers)
//!
//! | Bytes  | Register | Field                       | Type    | Range      |
//! |--------|----------|-----------------------------|---------|------------|
//! | 0-1    | 0        | Connection status           | u16     | 0 or 1     |
//! | 2-3    | 1        | Message counter             | u16     | wrapping   |
//! | 4-5    | 2        | Link quality                | u16 (%) | 80-100     |
//! | 6-13   | 3-6      | Latitude                    | f64     |            |
//! | 14-21  | 7-10     | Longitude                   | f64     |            |

use std::fmt;
use std::str::FromStr;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geo::{GeoPosition, GeoSimulator, POSITION_BYTES};

pub const STATION_FRAME_BYTES: usize = 40;
pub const DEVICE_FRAME_BYTES: usize = 22;

/// A station reports a dropped connection at most once every 23 ticks
pub const STATION_DROP_CADENCE: u64 = 23;
/// A device reports a dropped connection at most once every 17 ticks
pub const DEVICE_DROP_CADENCE: u64 = 17;

/// Class of simulated equipment whose frame fills the registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    /// Gateway reporting connected devices, signal strength and link quality
    Station,
    /// Field device reporting link quality and its position
    #[default]
    Device,
}

impl DeviceProfile {
    /// Frame length in bytes
    pub fn frame_len(&self) -> usize {
        match self {
            DeviceProfile::Station => STATION_FRAME_BYTES,
            DeviceProfile::Device => DEVICE_FRAME_BYTES,
        }
    }

    /// Number of holding registers covered by one frame
    pub fn register_count(&self) -> usize {
        self.frame_len().div_ceil(2)
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Station => write!(f, "station"),
            DeviceProfile::Device => write!(f, "device"),
        }
    }
}

impl FromStr for DeviceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "station" => Ok(DeviceProfile::Station),
            "device" => Ok(DeviceProfile::Device),
            other => Err(format!(
                "unknown profile '{}', expected 'station' or 'device'",
                other
            )),
        }
    }
}

/// Process-wide simulated time.
///
/// Owned by the tick driver and handed to the encoder on every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedCounters {
    /// Rolling message counter, wraps at 65535
    pub message_count: u16,
    /// Number of frames encoded so far
    pub elapsed_ticks: u64,
}

impl SimulatedCounters {
    fn next_tick(&mut self) -> u64 {
        self.elapsed_ticks = self.elapsed_ticks.wrapping_add(1);
        self.elapsed_ticks
    }

    fn add_messages(&mut self, increment: u16) -> u16 {
        self.message_count = self.message_count.wrapping_add(increment);
        self.message_count
    }
}

/// Connection status for a tick.
///
/// The link is reported up unless the tick falls on the drop cadence *and*
/// the random draw is `false`, so a drop is possible but never guaranteed.
pub fn connection_status(tick: u64, cadence: u64, draw: bool) -> bool {
    draw || cadence == 0 || tick % cadence != 0
}

/// One station reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationReading {
    pub connected: bool,
    pub message_count: u16,
    pub device_count: u16,
    pub signal_strength: u16,
    pub link_quality: f64,
}

impl StationReading {
    /// Draw the next reading, advancing the counters by one tick
    pub fn sample<R: Rng>(counters: &mut SimulatedCounters, rng: &mut R) -> Self {
        let tick = counters.next_tick();
        let draw: bool = rng.random();
        Self {
            connected: connection_status(tick, STATION_DROP_CADENCE, draw),
            message_count: counters.add_messages(rng.random_range(1..=50)),
            device_count: rng.random_range(17..=23),
            signal_strength: rng.random_range(70..=87),
            link_quality: rng.random_range(-70.0..=-40.0),
        }
    }

    pub fn to_bytes(&self) -> [u8; STATION_FRAME_BYTES] {
        let mut out = [0u8; STATION_FRAME_BYTES];
        out[0..2].copy_from_slice(&u16::from(self.connected).to_be_bytes());
        out[2..4].copy_from_slice(&self.message_count.to_be_bytes());
        out[4..6].copy_from_slice(&self.device_count.to_be_bytes());
        out[6..8].copy_from_slice(&self.signal_strength.to_be_bytes());
        out[8..16].copy_from_slice(&self.link_quality.to_be_bytes());
        out
    }

    /// Decode a station frame, `None` if `bytes` is too short
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < STATION_FRAME_BYTES {
            return None;
        }
        Some(Self {
            connected: be_u16(&bytes[0..2]) != 0,
            message_count: be_u16(&bytes[2..4]),
            device_count: be_u16(&bytes[4..6]),
            signal_strength: be_u16(&bytes[6..8]),
            link_quality: be_f64(&bytes[8..16]),
        })
    }
}

/// One device reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceReading {
    pub connected: bool,
    pub message_count: u16,
    pub link_quality: u16,
    pub position: GeoPosition,
}

impl DeviceReading {
    /// Draw the next reading, advancing the counters by one tick.
    ///
    /// The reading carries the position *before* the geo simulator takes its
    /// step for this tick.
    pub fn sample<R: Rng>(
        counters: &mut SimulatedCounters,
        geo: &mut GeoSimulator,
        rng: &mut R,
    ) -> Self {
        let tick = counters.next_tick();
        let draw: bool = rng.random();
        let reading = Self {
            connected: connection_status(tick, DEVICE_DROP_CADENCE, draw),
            message_count: counters.add_messages(rng.random_range(1..=3)),
            link_quality: rng.random_range(80..=100),
            position: geo.current_position(),
        };
        geo.advance(rng);
        reading
    }

    pub fn to_bytes(&self) -> [u8; DEVICE_FRAME_BYTES] {
        let mut out = [0u8; DEVICE_FRAME_BYTES];
        out[0..2].copy_from_slice(&u16::from(self.connected).to_be_bytes());
        out[2..4].copy_from_slice(&self.message_count.to_be_bytes());
        out[4..6].copy_from_slice(&self.link_quality.to_be_bytes());
        out[6..6 + POSITION_BYTES].copy_from_slice(&GeoSimulator::encode(&self.position, false));
        out
    }

    /// Decode a device frame, `None` if `bytes` is too short
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < DEVICE_FRAME_BYTES {
            return None;
        }
        Some(Self {
            connected: be_u16(&bytes[0..2]) != 0,
            message_count: be_u16(&bytes[2..4]),
            link_quality: be_u16(&bytes[4..6]),
            position: GeoPosition::new(be_f64(&bytes[6..14]), be_f64(&bytes[14..22])),
        })
    }
}

/// Encode the next station frame
pub fn encode_station<R: Rng>(
    counters: &mut SimulatedCounters,
    rng: &mut R,
) -> [u8; STATION_FRAME_BYTES] {
    let reading = StationReading::sample(counters, rng);
    debug!(
        "Station status: {} count: {} devices: {} signal: {} link quality: {:.2}",
        reading.connected,
        reading.message_count,
        reading.device_count,
        reading.signal_strength,
        reading.link_quality
    );
    reading.to_bytes()
}

/// Encode the next device frame and step the geo simulator
pub fn encode_device<R: Rng>(
    counters: &mut SimulatedCounters,
    geo: &mut GeoSimulator,
    rng: &mut R,
) -> [u8; DEVICE_FRAME_BYTES] {
    let reading = DeviceReading::sample(counters, geo, rng);
    debug!(
        "Device status: {} count: {} link quality: {} geo: {}, {}",
        reading.connected,
        reading.message_count,
        reading.link_quality,
        reading.position.latitude,
        reading.position.longitude
    );
    reading.to_bytes()
}

/// Pair bytes into big-endian words. An odd trailing byte becomes the high
/// byte of a last word.
pub fn frame_to_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        })
        .collect()
}

/// Inverse of [`frame_to_words`]
pub fn words_to_frame(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// Frame encoder for one device class
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryEncoder {
    profile: DeviceProfile,
}

impl TelemetryEncoder {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Encode the frame of the next tick as bytes
    pub fn encode<R: Rng>(
        &self,
        counters: &mut SimulatedCounters,
        geo: &mut GeoSimulator,
        rng: &mut R,
    ) -> Vec<u8> {
        match self.profile {
            DeviceProfile::Station => encode_station(counters, rng).to_vec(),
            DeviceProfile::Device => encode_device(counters, geo, rng).to_vec(),
        }
    }

    /// Encode the frame of the next tick as register words
    pub fn tick<R: Rng>(
        &self,
        counters: &mut SimulatedCounters,
        geo: &mut GeoSimulator,
        rng: &mut R,
    ) -> Vec<u16> {
        frame_to_words(&self.encode(counters, geo, rng))
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    f64::from_be_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    /// Source returning the same word forever: all zero bits make every
    /// boolean draw `false` and every range draw its lower bound.
    struct ConstRng(u64);

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (i, byte) in dst.iter_mut().enumerate() {
                *byte = self.0.to_le_bytes()[i % 8];
            }
        }
    }

    fn geo() -> GeoSimulator {
        GeoSimulator::new(GeoPosition::new(40.4168, -3.7038), 0.01)
    }

    #[test]
    fn test_frame_lengths_are_fixed() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counters = SimulatedCounters::default();
        let mut geo = geo();
        for _ in 0..500 {
            assert_eq!(encode_station(&mut counters, &mut rng).len(), 40);
            assert_eq!(encode_device(&mut counters, &mut geo, &mut rng).len(), 22);
        }
        assert_eq!(
            TelemetryEncoder::new(DeviceProfile::Station)
                .tick(&mut counters, &mut geo, &mut rng)
                .len(),
            20
        );
        assert_eq!(
            TelemetryEncoder::new(DeviceProfile::Device)
                .tick(&mut counters, &mut geo, &mut rng)
                .len(),
            11
        );
    }

    #[test]
    fn test_station_fields_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut counters = SimulatedCounters::default();
        for _ in 0..500 {
            let previous = counters.message_count;
            let frame = encode_station(&mut counters, &mut rng);
            let reading = StationReading::from_bytes(&frame).unwrap();

            let increment = reading.message_count.wrapping_sub(previous);
            assert!((1..=50).contains(&increment));
            assert!((17..=23).contains(&reading.device_count));
            assert!((70..=87).contains(&reading.signal_strength));
            assert!((-70.0..=-40.0).contains(&reading.link_quality));
            assert_eq!(frame[0], 0);
            assert!(frame[1] <= 1);
            assert!(frame[16..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn test_device_fields_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut counters = SimulatedCounters::default();
        let mut geo = geo();
        for _ in 0..500 {
            let previous = counters.message_count;
            let reading =
                DeviceReading::from_bytes(&encode_device(&mut counters, &mut geo, &mut rng))
                    .unwrap();
            let increment = reading.message_count.wrapping_sub(previous);
            assert!((1..=3).contains(&increment));
            assert!((80..=100).contains(&reading.link_quality));
        }
    }

    #[test]
    fn test_device_frame_uses_position_before_step() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counters = SimulatedCounters::default();
        let mut geo = geo();

        let start = geo.current_position();
        let frame = encode_device(&mut counters, &mut geo, &mut rng);
        let reading = DeviceReading::from_bytes(&frame).unwrap();

        assert_relative_eq!(reading.position.latitude, start.latitude);
        assert_relative_eq!(reading.position.longitude, start.longitude);
        assert_ne!(geo.current_position(), start);
        assert_eq!(&frame[6..], GeoSimulator::encode(&start, false).as_slice());
    }

    #[test]
    fn test_message_counter_wraps() {
        let mut counters = SimulatedCounters {
            message_count: 65535,
            elapsed_ticks: 0,
        };
        // The lowest draw is an increment of 1
        let frame = encode_station(&mut counters, &mut ConstRng(0));
        assert_eq!(counters.message_count, 0);
        assert_eq!(&frame[2..4], &[0, 0]);

        let mut rng = StdRng::seed_from_u64(9);
        let mut counters = SimulatedCounters {
            message_count: 65535,
            elapsed_ticks: 0,
        };
        encode_station(&mut counters, &mut rng);
        assert!((0..=49).contains(&counters.message_count));
    }

    #[test]
    fn test_device_drop_cadence() {
        let mut counters = SimulatedCounters::default();
        let mut geo = geo();

        // Every draw false: only the 17th tick reports a dropped link
        for tick in 1..=34u64 {
            let frame = encode_device(&mut counters, &mut geo, &mut ConstRng(0));
            let expected = if tick % 17 == 0 { 0 } else { 1 };
            assert_eq!(frame[1], expected, "tick {}", tick);
            assert_eq!(frame[0], 0);
        }

        // Every draw true: the link is never dropped
        let mut counters = SimulatedCounters::default();
        for _ in 1..=34 {
            let frame = encode_device(&mut counters, &mut geo, &mut ConstRng(u64::MAX));
            assert_eq!(frame[1], 1);
        }
    }

    #[test]
    fn test_station_drop_cadence() {
        let mut counters = SimulatedCounters::default();
        for tick in 1..=46u64 {
            let frame = encode_station(&mut counters, &mut ConstRng(0));
            assert_eq!(frame[1] == 0, tick % 23 == 0, "tick {}", tick);
        }
        assert_eq!(counters.elapsed_ticks, 46);
    }

    #[test]
    fn test_connection_status() {
        assert!(connection_status(1, 17, false));
        assert!(!connection_status(17, 17, false));
        assert!(connection_status(17, 17, true));
        assert!(!connection_status(46, 23, false));
        assert!(connection_status(5, 0, false));
    }

    #[test]
    fn test_frame_to_words_is_big_endian() {
        assert_eq!(frame_to_words(&[0x12, 0x34, 0x00, 0x01]), vec![0x1234, 0x0001]);
        assert_eq!(frame_to_words(&[0xAB]), vec![0xAB00]);
        assert_eq!(words_to_frame(&[0x1234, 0x0001]), vec![0x12, 0x34, 0x00, 0x01]);
    }

    #[test]
    fn test_register_word_round_trip() {
        for value in 0..=u16::MAX {
            let bytes = value.to_be_bytes();
            assert_eq!(frame_to_words(&bytes), vec![value]);
            assert_eq!(words_to_frame(&[value]), bytes.to_vec());
        }
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!("station".parse::<DeviceProfile>().unwrap(), DeviceProfile::Station);
        assert_eq!("Device".parse::<DeviceProfile>().unwrap(), DeviceProfile::Device);
        assert!("plc".parse::<DeviceProfile>().is_err());
        assert_eq!(DeviceProfile::Station.register_count(), 20);
        assert_eq!(DeviceProfile::Device.register_count(), 11);
    }
}
