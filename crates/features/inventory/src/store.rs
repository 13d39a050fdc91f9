//! Live interface instances keyed by absolute path, then by interface name.

use crate::interface::Interface;
use pim_domain::object::{Object, ObjectMap};
use std::collections::BTreeMap;

/// Interface name to its live instance, for one path.
pub type InterfaceComposite = BTreeMap<String, Box<dyn Interface>>;

/// The manager's object database.
///
/// A path is present only while it carries at least one interface: entries are
/// created by the first insert and removed as a whole.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: BTreeMap<String, InterfaceComposite>,
}

impl ObjectStore {
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&InterfaceComposite> {
        self.objects.get(path)
    }

    /// Interface names at `path`, ascending.
    #[must_use]
    pub fn interface_names(&self, path: &str) -> Vec<String> {
        self.objects.get(path).map(|c| c.keys().cloned().collect()).unwrap_or_default()
    }

    #[must_use]
    pub fn interface(&self, path: &str, name: &str) -> Option<&dyn Interface> {
        self.objects.get(path)?.get(name).map(AsRef::as_ref)
    }

    pub fn interface_mut(&mut self, path: &str, name: &str) -> Option<&mut (dyn Interface + 'static)> {
        self.objects.get_mut(path)?.get_mut(name).map(AsMut::as_mut)
    }

    /// Adds an instance, creating the path's entry on first use.
    pub fn insert(&mut self, path: &str, name: &str, handle: Box<dyn Interface>) {
        self.objects.entry(path.to_owned()).or_default().insert(name.to_owned(), handle);
    }

    /// Removes a whole path.
    pub fn remove(&mut self, path: &str) -> Option<InterfaceComposite> {
        self.objects.remove(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Bus form of the named interfaces at `path`; all of them when `only` is `None`.
    #[must_use]
    pub fn snapshot(&self, path: &str, only: Option<&[String]>) -> Object {
        let Some(composite) = self.objects.get(path) else {
            return Object::new();
        };
        composite
            .iter()
            .filter(|(name, _)| only.is_none_or(|names| names.contains(name)))
            .map(|(name, handle)| (name.clone(), handle.properties()))
            .collect()
    }

    /// Bus form of everything.
    #[must_use]
    pub fn snapshot_all(&self) -> ObjectMap {
        self.objects.keys().map(|path| (path.clone(), self.snapshot(path, None))).collect()
    }
}
