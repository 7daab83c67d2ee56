// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use rust_modsim::telemetry::encoder::words_to_frame;
use rust_modsim::telemetry::{DeviceProfile, DeviceReading, StationReading};
use tokio::time::Duration;
use tokio_modbus::prelude::*;

/// Modbus client reading the telemetry frame exposed by the simulator
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "40102")]
    port: u16,

    /// First holding register of the frame
    #[clap(long, default_value = "0")]
    base_address: u16,

    /// Frame layout: station or device
    #[clap(long, default_value = "device")]
    profile: DeviceProfile,

    /// Number of registers to read, defaults to the frame size
    #[clap(long)]
    quantity: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", args.address, args.port))?;
    println!("Connecting to Modbus server at {}", socket_addr);

    let mut ctx = tcp::connect(socket_addr).await?;

    let frame_registers = u16::try_from(args.profile.register_count())?;
    let quantity = args.quantity.unwrap_or(frame_registers);
    println!(
        "Reading {} holding registers starting at address {}",
        quantity, args.base_address
    );

    let response = tokio::time::timeout(
        Duration::from_secs(1),
        ctx.read_holding_registers(args.base_address, quantity),
    )
    .await
    .context("Request timed out")???;

    println!("Raw register values: {:?}", response);

    let frame = words_to_frame(&response);
    match args.profile {
        DeviceProfile::Station => match StationReading::from_bytes(&frame) {
            Some(reading) => {
                println!("Connected:       {}", reading.connected);
                println!("Messages:        {}", reading.message_count);
                println!("Devices:         {}", reading.device_count);
                println!("Signal strength: {}", reading.signal_strength);
                println!("Link quality:    {:.2} dBm", reading.link_quality);
            }
            None => println!("Not enough registers to decode a station frame"),
        },
        DeviceProfile::Device => match DeviceReading::from_bytes(&frame) {
            Some(reading) => {
                println!("Connected:    {}", reading.connected);
                println!("Messages:     {}", reading.message_count);
                println!("Link quality: {}", reading.link_quality);
                println!(
                    "Position:     {:.6}, {:.6}",
                    reading.position.latitude, reading.position.longitude
                );
            }
            None => println!("Not enough registers to decode a device frame"),
        },
    }

    Ok(())
}
