// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus service of the simulated slave
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the simulated slave device,
//! while the client is the master under test.
//!
//! ## Supported Requests
//!
//! | Function code | Request                  | Handling                              |
//! |---------------|--------------------------|---------------------------------------|
//! | 0x03          | Read Holding Registers   | Built-in path over the register store |
//! | configurable  | Custom read              | [`handle_read`] (disabled by default) |
//!
//! Every other function code, including all writes, is answered with
//! `IllegalFunction`. Reads outside the store get `IllegalDataAddress`.
//!
//! ## Custom Read Request
//!
//! The request payload is the start register followed by the byte count, both
//! big-endian `u16`. The response payload is the buffer built by
//! [`handle_read`]: the byte count followed by the register bytes.

use std::{future, sync::Arc};

use bytes::Bytes;
use log::{debug, error};
use tokio_modbus::prelude::*;

use super::read_handler::handle_read;
use super::register_store::RegisterStore;

/// A Modbus TCP service answering read requests from the shared register store.
///
/// The service is cheap to clone: every connection gets its own instance
/// pointing to the same `RegisterStore`.
#[derive(Debug, Clone)]
pub struct SimulatorModbusServer {
    store: Arc<RegisterStore>,

    /// Function code routed to the custom read handler, if any
    custom_function_code: Option<u8>,
}

impl tokio_modbus::server::Service for SimulatorModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => {
                debug!(
                    "Reading {} holding registers starting from address {}",
                    cnt, addr
                );
                self.read_holding_registers(addr, cnt)
                    .map(Response::ReadHoldingRegisters)
            }
            Request::Custom(code, payload) if Some(code) == self.custom_function_code => {
                self.custom_read(code, &payload)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl SimulatorModbusServer {
    /// Serve the given register store with the built-in read path only
    pub fn new(store: Arc<RegisterStore>) -> Self {
        Self {
            store,
            custom_function_code: None,
        }
    }

    /// Also answer `code` with the custom read handler
    pub fn with_custom_function_code(mut self, code: Option<u8>) -> Self {
        self.custom_function_code = code;
        self
    }

    pub fn store(&self) -> &Arc<RegisterStore> {
        &self.store
    }

    fn read_holding_registers(&self, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        self.store
            .read(usize::from(addr), usize::from(cnt))
            .map_err(|e| {
                error!("Exception::IllegalDataAddress - {}", e);
                e.exception_code()
                    .unwrap_or(ExceptionCode::IllegalDataAddress)
            })
    }

    fn custom_read(&self, code: u8, payload: &[u8]) -> Result<Response, ExceptionCode> {
        let [a0, a1, c0, c1, ..] = *payload else {
            error!(
                "Exception::IllegalDataValue - custom request payload too short: {} bytes",
                payload.len()
            );
            return Err(ExceptionCode::IllegalDataValue);
        };
        let addr = u16::from_be_bytes([a0, a1]);
        let cnt = u16::from_be_bytes([c0, c1]);

        let response = handle_read(&self.store, addr, cnt);
        match response.status.exception() {
            None => Ok(Response::Custom(code, Bytes::from(response.data))),
            Some(exception) => Err(exception),
        }
    }
}
