//! The inventory manager: owns the object store and everything that mutates it.

mod builder;
mod merge;
mod restore;
mod service;

pub use builder::{ManagerBuilder, NoBus, WithBus};

use crate::error::InventoryError;
use crate::events::EventTable;
use crate::interface::InterfaceSchema;
use crate::persist::Persistence;
use crate::registry::{Maker, Registry};
use crate::store::ObjectStore;
use fxhash::FxHashMap;
use pim_associations::{ASSOCIATION_INTERFACE, ASSOCIATIONS_PROPERTY, AssociationManager};
use pim_bus::{Bus, Inbound, MatchId, Signal};
use pim_domain::config::ManagerConfig;
use pim_domain::object::{ObjectMap, PropertyMap, absolize};
use pim_domain::status::ManagerStatus;
use pim_domain::value::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// Hosts inventory objects under one root and keeps them persisted.
///
/// Every mutation goes through `&mut self`, so the store, the association
/// state and the persisted files change in one strict order: the order in
/// which calls and signals reach the run loop.
///
/// Every path taken by the public API is relative to [`Self::root`], which is
/// prepended before the store is consulted. Paths handed out (signals, the
/// store, [`Self::managed_objects`]) are absolute.
#[derive(Debug)]
pub struct Manager {
    config: ManagerConfig,
    root: String,
    bus: Arc<dyn Bus>,
    registry: Arc<Registry>,
    events: Arc<EventTable>,
    matches: FxHashMap<MatchId, usize>,
    store: ObjectStore,
    persistence: Persistence,
    associations: Option<AssociationManager>,
    status: ManagerStatus,
    inbound: Option<UnboundedReceiver<Inbound>>,
}

impl Manager {
    #[must_use]
    pub fn builder() -> ManagerBuilder<NoBus> {
        ManagerBuilder::new()
    }

    /// The absolute inventory root.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub const fn status(&self) -> ManagerStatus {
        self.status
    }

    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &ObjectStore {
        &self.store
    }

    #[must_use]
    pub const fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    #[must_use]
    pub const fn associations(&self) -> Option<&AssociationManager> {
        self.associations.as_ref()
    }

    /// Creates or updates objects from an action.
    pub fn create_objects(&mut self, objects: ObjectMap) {
        self.update_objects(objects, false);
    }

    /// Creates or updates objects on behalf of a `Notify` caller.
    ///
    /// Failures are logged per interface and never reported back.
    pub fn notify(&mut self, objects: ObjectMap) {
        self.update_objects(objects, false);
    }

    /// Tears down whole paths, along with their persisted state and associations.
    pub fn destroy_objects(&mut self, paths: &[String]) {
        for path in paths {
            let path = absolize(&self.root, path);
            let Some(composite) = self.store.remove(&path) else {
                debug!(%path, "Nothing to destroy");
                continue;
            };

            let mut interfaces: Vec<String> = composite.into_keys().collect();
            for name in &interfaces {
                if let Err(err) = self.persistence.discard(&path, name) {
                    warn!(%path, interface = %name, error = %err, "Failed to discard persisted state");
                }
            }
            if let Some(associations) = self.associations.as_mut()
                && associations.remove(&path)
            {
                interfaces.push(ASSOCIATION_INTERFACE.to_owned());
                interfaces.sort();
            }

            info!(%path, interfaces = interfaces.len(), "Object destroyed");
            if self.status.is_running() {
                self.emit(Signal::ObjectRemoved { path, interfaces });
            }
        }
    }

    /// Assigns one property. Returns `true` if the value changed.
    ///
    /// A change is persisted and, once running, announced as a
    /// `PropertiesChanged` carrying only that property.
    ///
    /// # Errors
    ///
    /// [`InventoryError::NotFound`] if the path does not host `interface`,
    /// [`InventoryError::Interface`] if the property is unknown or the value
    /// has the wrong type.
    pub fn set_property(
        &mut self,
        path: &str,
        interface: &str,
        property: &str,
        value: Value,
    ) -> Result<bool, InventoryError> {
        let path = absolize(&self.root, path);
        let handle = self
            .store
            .interface_mut(&path, interface)
            .ok_or_else(|| InventoryError::not_found(&path, interface))?;
        if !handle.set_property(property, value.clone())? {
            return Ok(false);
        }

        let maker = *self.registry.get(interface)?;
        self.persist(&maker, &path, interface);
        if self.status.is_running() {
            let mut changed = PropertyMap::new();
            changed.insert(property.to_owned(), value);
            self.emit(Signal::PropertiesChanged { path, interface: interface.to_owned(), changed });
        }
        Ok(true)
    }

    /// # Errors
    /// [`InventoryError::NotFound`] if the path, interface or property is not hosted here.
    pub fn get_property(
        &self,
        path: &str,
        interface: &str,
        property: &str,
    ) -> Result<Value, InventoryError> {
        self.get_all(path, interface)?.remove(property).ok_or_else(|| InventoryError::NotFound {
            message: property.to_owned().into(),
            context: Some(format!("{path} {interface}").into()),
        })
    }

    /// # Errors
    /// [`InventoryError::NotFound`] if the path does not host `interface`.
    pub fn get_all(&self, path: &str, interface: &str) -> Result<PropertyMap, InventoryError> {
        let path = absolize(&self.root, path);
        if let Some(handle) = self.store.interface(&path, interface) {
            return Ok(handle.properties());
        }
        if interface == ASSOCIATION_INTERFACE
            && let Some(props) = self.associations.as_ref().and_then(|a| a.interface_snapshot(&path))
        {
            return Ok(props);
        }
        Err(InventoryError::not_found(&path, interface))
    }

    /// Everything hosted here, association interfaces included.
    #[must_use]
    pub fn managed_objects(&self) -> ObjectMap {
        let mut objects = self.store.snapshot_all();
        if let Some(associations) = &self.associations {
            for (path, list) in associations.instances() {
                let mut props = PropertyMap::new();
                props.insert(ASSOCIATIONS_PROPERTY.to_owned(), Value::Associations(list.to_vec()));
                objects
                    .entry(path.to_owned())
                    .or_default()
                    .insert(ASSOCIATION_INTERFACE.to_owned(), props);
            }
        }
        objects
    }

    /// Borrows the concrete instance of `T` at `path`.
    ///
    /// # Errors
    ///
    /// [`InventoryError::TypeMismatch`] if `T` is not the type registered for
    /// its interface name, [`InventoryError::NotFound`] if it is not hosted at `path`.
    pub fn interface<T: InterfaceSchema>(&self, path: &str) -> Result<&T, InventoryError> {
        self.typed_maker::<T>()?;
        let path = absolize(&self.root, path);
        self.store
            .interface(&path, T::NAME)
            .ok_or_else(|| InventoryError::not_found(&path, T::NAME))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| InventoryError::type_mismatch(T::NAME, std::any::type_name::<T>()))
    }

    /// Mutably borrows the concrete instance of `T` at `path`.
    ///
    /// Changes made through the borrow are neither persisted nor announced;
    /// use [`Self::invoke`] for that.
    ///
    /// # Errors
    ///
    /// Same as [`Self::interface`].
    pub fn interface_mut<T: InterfaceSchema>(&mut self, path: &str) -> Result<&mut T, InventoryError> {
        self.typed_maker::<T>()?;
        let path = absolize(&self.root, path);
        self.store
            .interface_mut(&path, T::NAME)
            .ok_or_else(|| InventoryError::not_found(&path, T::NAME))?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| InventoryError::type_mismatch(T::NAME, std::any::type_name::<T>()))
    }

    /// Runs `f` against the concrete instance of `T` at `path`.
    ///
    /// Properties that differ afterwards are persisted and, once running,
    /// announced in one `PropertiesChanged`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::interface`].
    pub fn invoke<T, R>(&mut self, path: &str, f: impl FnOnce(&mut T) -> R) -> Result<R, InventoryError>
    where
        T: InterfaceSchema,
    {
        let maker = self.typed_maker::<T>()?;
        let path = absolize(&self.root, path);
        let handle = self
            .store
            .interface_mut(&path, T::NAME)
            .ok_or_else(|| InventoryError::not_found(&path, T::NAME))?;

        let before = handle.properties();
        let typed = handle
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| InventoryError::type_mismatch(T::NAME, std::any::type_name::<T>()))?;
        let result = f(typed);
        let changed: PropertyMap =
            handle.properties().into_iter().filter(|(k, v)| before.get(k) != Some(v)).collect();

        if !changed.is_empty() {
            self.persist(&maker, &path, T::NAME);
            if self.status.is_running() {
                self.emit(Signal::PropertiesChanged { path, interface: T::NAME.to_owned(), changed });
            }
        }
        Ok(result)
    }

    fn typed_maker<T: InterfaceSchema>(&self) -> Result<Maker, InventoryError> {
        let maker = *self.registry.get(T::NAME)?;
        if !maker.is::<T>() {
            return Err(InventoryError::type_mismatch(T::NAME, std::any::type_name::<T>()));
        }
        Ok(maker)
    }

    /// Writes the current state of one hosted interface. Failures are logged.
    fn persist(&self, maker: &Maker, path: &str, interface: &str) {
        let Some(handle) = self.store.interface(path, interface) else {
            return;
        };
        let result = maker
            .serialize(handle)
            .and_then(|data| Ok(self.persistence.save(path, interface, &data)?));
        if let Err(err) = result {
            error!(%path, %interface, error = %err, "Failed to persist interface");
        }
    }

    fn emit(&self, signal: Signal) {
        if let Err(err) = self.bus.emit(signal) {
            warn!(error = %err, "Signal not delivered");
        }
    }
}
