use crate::object::DEFAULT_INVENTORY_ROOT;
use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration of the inventory manager.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfigInner {
    pub bus: BusConfig,
    pub persistence: PersistenceConfig,
    pub associations: AssociationsConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    #[serde(flatten, default)]
    inner: Arc<ManagerConfigInner>,
}

impl Deref for ManagerConfig {
    type Target = ManagerConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ManagerConfig {
    fn deref_mut(&mut self) -> &mut ManagerConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Bus identity of the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Well-known name claimed once restore has completed.
    pub name: String,
    /// Inventory root every relative path is anchored to.
    pub root: String,
}

/// Where interface state is persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub path: PathBuf,
    pub create: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssociationsConfig {
    pub enabled: bool,
    /// Default rule file; its directory is scanned for condition files.
    pub file: PathBuf,
}

/// Optional declarative event table.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub console: bool,
    pub path: Option<PathBuf>,
    pub json: bool,
}

// --- Default ---

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: "xyz.openbmc_project.Inventory.Manager".to_owned(),
            root: DEFAULT_INVENTORY_ROOT.to_owned(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("/var/lib/phosphor-inventory-manager"), create: true }
    }
}

impl Default for AssociationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: PathBuf::from("/usr/share/phosphor-inventory-manager/associations.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), console: true, path: None, json: false }
    }
}
