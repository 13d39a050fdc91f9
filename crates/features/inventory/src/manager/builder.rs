use super::Manager;
use crate::catalog::standard_registry;
use crate::error::InventoryError;
use crate::events::{EventTable, Trigger};
use crate::persist::Persistence;
use crate::registry::Registry;
use crate::store::ObjectStore;
use fxhash::FxHashMap;
use pim_associations::AssociationManager;
use pim_bus::{Bus, MatchRule};
use pim_domain::config::ManagerConfig;
use pim_domain::status::ManagerStatus;
use private::Sealed;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct NoBus;
#[derive(Debug)]
pub struct WithBus(Arc<dyn Bus>);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoBus {}
impl Sealed for WithBus {}

/// Typestate builder: a bus connection must be supplied before the manager is built.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct ManagerBuilder<S: Sealed = NoBus> {
    state: S,
    config: ManagerConfig,
    registry: Option<Arc<Registry>>,
    events: Option<Arc<EventTable>>,
}

impl Default for ManagerBuilder<NoBus> {
    fn default() -> Self {
        Self { state: NoBus, config: ManagerConfig::default(), registry: None, events: None }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> ManagerBuilder<S> {
    #[must_use = "Sets the manager configuration"]
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Interface types the manager can host. Defaults to the standard catalog.
    #[must_use = "Sets the interface registry"]
    pub fn registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Events to run. Defaults to the configured event file, or none.
    #[must_use = "Sets the event table"]
    pub fn events(mut self, events: impl Into<Arc<EventTable>>) -> Self {
        self.events = Some(events.into());
        self
    }
}

impl ManagerBuilder<NoBus> {
    #[must_use = "Creates a new manager builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the bus connection the manager serves on"]
    pub fn bus(self, bus: Arc<dyn Bus>) -> ManagerBuilder<WithBus> {
        ManagerBuilder {
            state: WithBus(bus),
            config: self.config,
            registry: self.registry,
            events: self.events,
        }
    }
}

impl ManagerBuilder<WithBus> {
    /// Builds the manager and restores persisted state.
    ///
    /// 1. Validates the root and the bus name.
    /// 2. Opens persistence and loads association rules. A missing persistence
    ///    root with creation disabled is logged and leaves the store empty.
    /// 3. Takes the inbound queue, announces the object manager and registers
    ///    one match per signal event.
    /// 4. Restores persisted objects with signals suppressed.
    ///
    /// The manager is not reachable until [`Manager::start`] claims the bus name.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Validation`] for a bad root or name, and whatever the
    /// registry, event file, persistence root or bus reports.
    pub fn build(self) -> Result<Manager, InventoryError> {
        let config = self.config;
        let bus = self.state.0;

        let root = match config.bus.root.trim_end_matches('/') {
            "" if config.bus.root.starts_with('/') => "/".to_owned(),
            trimmed => trimmed.to_owned(),
        };
        if !root.starts_with('/') {
            return Err(InventoryError::Validation {
                message: config.bus.root.clone().into(),
                context: Some("Inventory root must be an absolute path".into()),
            });
        }
        if config.bus.name.is_empty() {
            return Err(InventoryError::Validation {
                message: "empty bus name".into(),
                context: None,
            });
        }

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(standard_registry()?),
        };
        let events = match (self.events, &config.events.file) {
            (Some(events), _) => events,
            (None, Some(file)) => Arc::new(EventTable::load(file)?),
            (None, None) => Arc::new(EventTable::default()),
        };

        let persistence = Persistence::open(&config.persistence.path, config.persistence.create)?;
        let associations = config.associations.enabled.then(|| {
            AssociationManager::builder()
                .root(root.clone())
                .file(config.associations.file.clone())
                .load(Arc::clone(&bus))
        });

        let inbound = bus.inbound()?;
        bus.add_object_manager(&root);

        let mut matches = FxHashMap::default();
        for (index, event) in events.iter().enumerate() {
            if let Trigger::Signal(rule) = event.trigger() {
                let id = bus.add_match(rule.parse::<MatchRule>()?)?;
                debug!(event = %event.name(), %rule, %id, "Registered event match");
                matches.insert(id, index);
            }
        }
        info!(
            %root,
            interfaces = registry.len(),
            events = events.len(),
            matches = matches.len(),
            "Inventory manager configured"
        );

        let mut manager = Manager {
            config,
            root,
            bus,
            registry,
            events,
            matches,
            store: ObjectStore::default(),
            persistence,
            associations,
            status: ManagerStatus::Starting,
            inbound: Some(inbound),
        };
        manager.restore();
        Ok(manager)
    }
}
