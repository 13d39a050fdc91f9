use super::Manager;
use crate::registry::Maker;
use pim_bus::Signal;
use pim_domain::object::{Object, ObjectMap, absolize, is_valid_object};
use pim_domain::status::EmissionPolicy;
use tracing::{debug, error, warn};

impl Manager {
    /// Merges a batch of objects into the store.
    ///
    /// With `restore` set the batch is a skeleton of interface names, and state
    /// is read back from persistence instead of written to it.
    pub(crate) fn update_objects(&mut self, objects: ObjectMap, restore: bool) {
        for (path, object) in objects {
            if !is_valid_object(&object) {
                warn!(%path, "Ignoring object without interfaces");
                continue;
            }
            let path = absolize(&self.root, &path);
            let is_new = !self.store.contains(&path);

            let added = self.update_interfaces(&path, &object, restore);
            if self.status.is_running() && !added.is_empty() {
                let signal = if is_new {
                    Signal::ObjectAdded { interfaces: self.store.snapshot(&path, None), path: path.clone() }
                } else {
                    Signal::InterfacesAdded {
                        interfaces: self.store.snapshot(&path, Some(&added)),
                        path: path.clone(),
                    }
                };
                self.emit(signal);
            }

            self.update_associations(&path, &object, is_new, restore);
        }
    }

    /// Constructs missing interfaces and assigns existing ones, in name order.
    ///
    /// Returns the names of the interfaces that were constructed. A failing
    /// interface is logged and left out; the store never holds a half-built one.
    fn update_interfaces(&mut self, path: &str, object: &Object, restore: bool) -> Vec<String> {
        let policy = EmissionPolicy::for_status(self.status);
        let mut added = Vec::new();

        for (name, properties) in object {
            let maker = match self.registry.get(name) {
                Ok(maker) => *maker,
                Err(err) => {
                    error!(%path, interface = %name, error = %err, "Skipping interface");
                    continue;
                },
            };

            match self.store.interface_mut(path, name) {
                None => match maker.construct(properties) {
                    Ok(handle) => {
                        self.store.insert(path, name, handle);
                        added.push(name.clone());
                    },
                    Err(err) => {
                        error!(%path, interface = %name, error = %err, "Failed to construct interface");
                        continue;
                    },
                },
                Some(handle) => match maker.assign(properties, handle) {
                    Ok(changed) if policy.emits() && !changed.is_empty() => {
                        self.emit(Signal::PropertiesChanged {
                            path: path.to_owned(),
                            interface: name.clone(),
                            changed,
                        });
                    },
                    Ok(_) => {},
                    Err(err) => {
                        error!(%path, interface = %name, error = %err, "Failed to update interface");
                        continue;
                    },
                },
            }

            if restore {
                self.reload(&maker, path, name);
            } else {
                self.persist(&maker, path, name);
            }
        }
        added
    }

    /// Reads persisted state into a hosted interface.
    ///
    /// A corrupt file is deleted and the interface keeps its defaults.
    fn reload(&mut self, maker: &Maker, path: &str, interface: &str) {
        let data = match self.persistence.load(path, interface) {
            Ok(Some(data)) => data,
            Ok(None) => return,
            Err(err) => {
                warn!(%path, %interface, error = %err, "Failed to read persisted state");
                return;
            },
        };
        let Some(handle) = self.store.interface_mut(path, interface) else {
            return;
        };
        if let Err(err) = maker.deserialize(&data, handle) {
            error!(%path, %interface, error = %err, "Discarding corrupt persisted state");
            if let Err(err) = self.persistence.discard(path, interface) {
                warn!(%path, %interface, error = %err, "Failed to remove corrupt state");
            }
        }
    }

    fn update_associations(&mut self, path: &str, object: &Object, is_new: bool, restore: bool) {
        let policy = EmissionPolicy::for_status(self.status);
        let Some(associations) = self.associations.as_mut() else {
            return;
        };

        if !associations.pending_condition() {
            if is_new && self.store.contains(path) {
                associations.create_associations(path, policy);
            }
        } else if !restore && associations.condition_match(path, object) {
            debug!(%path, "Association condition satisfied; creating for every known path");
            for known in self.store.paths() {
                associations.create_associations(known, policy);
            }
        }
    }
}
