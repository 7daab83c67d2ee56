// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modsim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module runs the background tasks of the simulator:
//!
//! - Modbus TCP server answering the master under test
//! - Tick driver writing a telemetry frame into the registers on every tick
//! - System health monitoring (heartbeat)
//!
//! The daemon system uses Tokio's asynchronous runtime. Each service runs as
//! an independent task and checks a shared `running` flag to terminate.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modsim::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use log::{debug, error, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::{Config, MemoryConfig};
use crate::error::SimulatorError;
use crate::modbus::{RegisterStore, SimulatorModbusServer};
use crate::telemetry::{GeoSimulator, TelemetryEncoder, TickDriver};

/// Interval at which tasks check the `running` flag
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Interval between two heartbeat log lines
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Represents a daemon task manager that coordinates the simulator services
///
/// # Thread Safety
///
/// The `running` flag is wrapped in an `Arc` to be shared with every task.
/// The register store is shared between the Modbus server and the tick
/// driver; it serializes accesses itself.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    register_store: Option<Arc<RegisterStore>>,
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            register_store: None,
            modbus_addr: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// # Errors
    ///
    /// Fails if the Modbus address cannot be parsed. A listener that cannot
    /// be bound is only logged: the daemon keeps running without it.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let store = Arc::new(build_register_store(&config.memory));
        info!("Serving {} holding registers", store.capacity());
        self.register_store = Some(store.clone());

        if config.modbus.enabled {
            self.start_modbus_server(config, store.clone()).await?;
        }

        if config.simulation.is_active() {
            self.start_tick_driver(config, store);
        } else {
            info!("Telemetry simulation disabled");
        }

        self.start_heartbeat();

        Ok(())
    }

    /// Register store shared by all services, once launched
    pub fn register_store(&self) -> Option<Arc<RegisterStore>> {
        self.register_store.clone()
    }

    /// Address the Modbus listener is bound to, if it is running
    pub fn modbus_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// Launch the modbus server daemon
    ///
    /// Binds the listener then spawns the accept loop. Every connection gets
    /// its own service instance over the shared register store.
    async fn start_modbus_server(
        &mut self,
        config: &Config,
        store: Arc<RegisterStore>,
    ) -> Result<()> {
        let bind_address = format!("{}:{}", config.modbus.address, config.modbus.port);
        info!("Starting modbus server on {}", bind_address);

        let socket_addr: SocketAddr = match bind_address.parse() {
            Ok(addr) => addr,
            Err(_) => tokio::net::lookup_host(&bind_address)
                .await?
                .next()
                .ok_or_else(|| anyhow::anyhow!("Invalid socket address: {}", bind_address))?,
        };

        let listener = match TcpListener::bind(socket_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = SimulatorError::ListenerFailure {
                    address: bind_address,
                    source,
                };
                error!("{}", err);
                return Ok(());
            }
        };
        let local_addr = listener.local_addr()?;
        self.modbus_addr = Some(local_addr);

        let service = SimulatorModbusServer::new(store)
            .with_custom_function_code(config.modbus.custom_function_code);
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            let server = Server::new(listener);

            let on_connected = move |stream, socket_addr: SocketAddr| {
                info!("Connection established from {}", socket_addr);
                let service = service.clone();
                async move {
                    accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                        Ok(Some(service.clone()))
                    })
                }
            };

            let on_process_error = |err| {
                error!("Modbus server error: {err}");
            };

            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.serve(&on_connected, on_process_error).await {
                    error!("Modbus server error: {}", e);
                }
            });

            while running.load(Ordering::SeqCst) && !server_handle.is_finished() {
                time::sleep(POLL_INTERVAL).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            match time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => {
                    warn!("Modbus server shutdown timed out, forcing termination");
                }
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server active on {}", local_addr);
        Ok(())
    }

    /// Start the periodic telemetry update
    fn start_tick_driver(&mut self, config: &Config, store: Arc<RegisterStore>) {
        let simulation = config.simulation.clone();
        info!(
            "Writing a {} frame at register {} every {} ms",
            simulation.profile, simulation.base_address, simulation.tick_ms
        );

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut rng = StdRng::from_os_rng();
            let geo = GeoSimulator::from_reference_file(
                &simulation.reference_file,
                simulation.geo_step,
                &mut rng,
            );
            let mut driver = TickDriver::new(
                store,
                TelemetryEncoder::new(simulation.profile),
                geo,
                usize::from(simulation.base_address),
                rng,
            );

            let mut interval = time::interval(Duration::from_millis(simulation.tick_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {
                        // Shutdown may have been requested while waiting
                        if running.load(Ordering::SeqCst) {
                            driver.tick_logged();
                        }
                    }
                    _ = time::sleep(POLL_INTERVAL) => {}
                }
            }

            debug!(
                "Tick driver stopped after {} ticks",
                driver.counters().elapsed_ticks
            );
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut since_last_beat = Duration::ZERO;
            while running.load(Ordering::SeqCst) {
                time::sleep(POLL_INTERVAL).await;
                since_last_beat += POLL_INTERVAL;
                if since_last_beat >= HEARTBEAT_INTERVAL {
                    debug!("Daemon heartbeat: running");
                    since_last_beat = Duration::ZERO;
                }
            }
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Task panics and task errors are logged, not returned.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}

/// Build the register store from the configured snapshot, falling back to a
/// zero-filled full register space.
pub fn build_register_store(memory: &MemoryConfig) -> RegisterStore {
    match &memory.snapshot {
        Some(path) => RegisterStore::from_snapshot_file_or_default(path),
        None => RegisterStore::default(),
    }
}
