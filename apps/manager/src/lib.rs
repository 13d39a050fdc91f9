//! # Inventory Manager Service
//!
//! Wires the configuration, the bus connection and the inventory core into
//! one long-running service.
//!
//! ## Example
//! ```no_run
//! use pim_manager::App;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     App::builder().build()?.run().await
//! }
//! ```

use anyhow::{Context, Result};
use pim_bus::LocalBus;
use pim_inventory::Manager;
use pim_kernel::domain::config::ManagerConfig;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Configures the service before anything touches the bus or the disk.
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct AppBuilder {
    config: ManagerConfig,
    bus: Option<LocalBus>,
}

impl AppBuilder {
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing connection instead of opening a fresh one.
    pub fn bus(mut self, bus: LocalBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the manager. Persisted state is restored before this returns.
    ///
    /// # Errors
    /// Returns an error if the inventory root is invalid, the persistence
    /// directory cannot be opened, or the event table is malformed.
    pub fn build(self) -> Result<App> {
        let bus = self.bus.unwrap_or_default();
        info!(name = %self.config.bus.name, root = %self.config.bus.root, "Initializing inventory manager");

        let manager = Manager::builder()
            .config(self.config)
            .bus(Arc::new(bus.clone()))
            .build()
            .context("Failed to initialize the inventory manager")?;
        Ok(App { manager, bus })
    }
}

/// A restored manager, ready to serve.
#[must_use = "call .run().await to start serving"]
#[derive(Debug)]
pub struct App {
    manager: Manager,
    bus: LocalBus,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    #[must_use]
    pub const fn bus(&self) -> &LocalBus {
        &self.bus
    }

    #[must_use]
    pub const fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Serves until SIGINT/SIGTERM or until the bus asks the manager to stop.
    ///
    /// # Errors
    /// Returns an error if the manager cannot claim its bus name.
    pub async fn run(self) -> Result<()> {
        let Self { mut manager, bus } = self;

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, stopping...");
            bus.shutdown();
        });

        manager.run().await.context("Inventory manager failed")?;
        info!("Service shutdown complete");
        Ok(())
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
