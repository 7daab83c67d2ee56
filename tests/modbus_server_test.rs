// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the SimulatorModbusServer implementation
//!
//! These tests validate the Modbus server functionality by starting a server
//! instance and connecting to it via a Modbus client. Reads of holding
//! registers, the custom read function code and error conditions are tested.

use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::time;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use rust_modsim::modbus::{RegisterStore, SimulatorModbusServer};

const CUSTOM_CODE: u8 = 0x41;

/// Test utility function to start a Modbus server in the background
async fn start_test_server(
    store: Arc<RegisterStore>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), Box<dyn std::error::Error>> {
    // Use port 0 to let the OS assign an available port
    let socket_addr = SocketAddr::from_str("127.0.0.1:0")?;
    let listener = TcpListener::bind(socket_addr).await?;
    let socket_addr = listener.local_addr()?;

    let server = Server::new(listener);
    let service = SimulatorModbusServer::new(store).with_custom_function_code(Some(CUSTOM_CODE));

    let on_connected = move |stream, socket_addr| {
        let service = service.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                Ok(Some(service.clone()))
            })
        }
    };

    let on_process_error = |err| {
        eprintln!("Server error: {}", err);
    };

    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&on_connected, on_process_error).await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server a moment to start
    time::sleep(Duration::from_millis(100)).await;

    Ok((socket_addr, handle))
}

fn ten_register_store() -> Arc<RegisterStore> {
    Arc::new(RegisterStore::from_values(vec![
        10, 20, 30, 40, 50, 60, 70, 80, 90, 100,
    ]))
}

#[tokio::test]
async fn test_read_holding_registers() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _server_handle) = start_test_server(ten_register_store()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let data = ctx.read_holding_registers(0, 4).await??;
    assert_eq!(data, vec![10, 20, 30, 40]);

    let data = ctx.read_holding_registers(8, 2).await??;
    assert_eq!(data, vec![90, 100]);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_register_address() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _server_handle) = start_test_server(ten_register_store()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.read_holding_registers(9, 2).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));

    let result = ctx.read_holding_registers(100, 1).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_writes_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let store = ten_register_store();
    let (socket_addr, _server_handle) = start_test_server(store.clone()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.write_single_register(2, 999).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalFunction));

    let result = ctx.write_multiple_registers(1, &[101, 202]).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalFunction));

    assert_eq!(store.read(0, 4)?, vec![10, 20, 30, 40]);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_unsupported_function() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _server_handle) = start_test_server(ten_register_store()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.read_coils(0, 1).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalFunction));

    let result = ctx.read_input_registers(0, 1).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalFunction));

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_custom_read_function() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _server_handle) = start_test_server(ten_register_store()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    // Start register 3, 4 bytes: two registers copied big-endian
    let response = ctx
        .call(Request::Custom(CUSTOM_CODE, Cow::Borrowed(&[0, 3, 0, 4])))
        .await??;
    assert_eq!(
        response,
        Response::Custom(CUSTOM_CODE, vec![4, 0, 40, 0, 50].into())
    );

    let result = ctx
        .call(Request::Custom(CUSTOM_CODE, Cow::Borrowed(&[0, 9, 0, 4])))
        .await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_multiple_clients_see_updates() -> Result<(), Box<dyn std::error::Error>> {
    let store = ten_register_store();
    let (socket_addr, _server_handle) = start_test_server(store.clone()).await?;

    let mut client1 = tcp::connect(socket_addr).await?;
    let mut client2 = tcp::connect(socket_addr).await?;

    // The simulator side updates the registers, both masters observe it
    store.write(5, &[888, 999])?;

    let data1 = client1.read_holding_registers(5, 2).await??;
    let data2 = client2.read_holding_registers(5, 2).await??;
    assert_eq!(data1, vec![888, 999]);
    assert_eq!(data1, data2);

    client1.disconnect().await?;
    client2.disconnect().await?;
    Ok(())
}
