use crate::rules::{self, Condition, Rules};
use fxhash::FxHashSet;
use pim_bus::{Bus, Signal};
use pim_domain::object::{DEFAULT_INVENTORY_ROOT, Object, PropertyMap};
use pim_domain::status::EmissionPolicy;
use pim_domain::value::{Association, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Interface that carries the relationship tuples of a forward path.
pub const ASSOCIATION_INTERFACE: &str = "xyz.openbmc_project.Association.Definitions";
/// Its single property.
pub const ASSOCIATIONS_PROPERTY: &str = "Associations";

/// Derives association interfaces from declarative rules.
///
/// Rules are either active from the start (the default file) or held back by
/// condition files until one of their conditions is observed. Creation is
/// attempted at most once per forward path for the lifetime of the manager.
#[derive(Debug)]
pub struct AssociationManager {
    root: String,
    bus: Arc<dyn Bus>,
    associations: Rules,
    handled: FxHashSet<String>,
    conditions: Vec<Condition>,
    instances: BTreeMap<String, Vec<Association>>,
}

#[derive(Debug)]
pub struct AssociationManagerBuilder {
    root: String,
    file: Option<PathBuf>,
}

impl Default for AssociationManagerBuilder {
    fn default() -> Self {
        Self { root: DEFAULT_INVENTORY_ROOT.to_owned(), file: None }
    }
}

impl AssociationManagerBuilder {
    #[must_use = "Sets the inventory root rule paths are anchored to"]
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use = "Sets the default rule file; its directory is scanned for condition files"]
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Loads the declarative input. Never fails: bad files are logged and skipped.
    ///
    /// 1. Every `*.json` file next to the default file that has a `condition`
    ///    block becomes a pending gate.
    /// 2. Without gates, the default file's rules are active immediately.
    #[must_use]
    pub fn load(self, bus: Arc<dyn Bus>) -> AssociationManager {
        let mut manager = AssociationManager {
            root: self.root,
            bus,
            associations: Rules::new(),
            handled: FxHashSet::default(),
            conditions: Vec::new(),
            instances: BTreeMap::new(),
        };

        let Some(file) = self.file else {
            return manager;
        };

        manager.conditions = scan_conditions(&file, &manager.root);
        if !manager.conditions.is_empty() {
            info!(count = manager.conditions.len(), "Association rules gated by conditions");
            return manager;
        }

        if file.is_file() {
            match rules::load_rules(&file, &manager.root) {
                Ok(rules) => {
                    info!(paths = rules.len(), file = %file.display(), "Association rules loaded");
                    manager.associations = rules;
                },
                Err(err) => error!(file = %file.display(), error = %err, "Discarding association file"),
            }
        } else {
            debug!(file = %file.display(), "No association file");
        }
        manager
    }
}

fn scan_conditions(file: &Path, root: &str) -> Vec<Condition> {
    let Some(dir) = file.parent().filter(|d| d.is_dir()) else {
        return Vec::new();
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "Cannot scan for condition files");
            return Vec::new();
        },
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    candidates.sort();

    candidates
        .iter()
        .filter_map(|candidate| match rules::load_condition(candidate, root) {
            Ok(condition) => condition,
            Err(err) => {
                error!(file = %candidate.display(), error = %err, "Skipping condition file");
                None
            },
        })
        .collect()
}

impl AssociationManager {
    #[must_use]
    pub fn builder() -> AssociationManagerBuilder {
        AssociationManagerBuilder::default()
    }

    /// `true` while rules are held back by at least one condition.
    #[must_use]
    pub const fn pending_condition(&self) -> bool {
        !self.conditions.is_empty()
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Lets the restore pass record the values it observed.
    pub fn conditions_mut(&mut self) -> &mut [Condition] {
        &mut self.conditions
    }

    /// Checks `object`, observed at `path`, against the pending conditions.
    ///
    /// The first satisfied condition activates its rules and discards all
    /// others. Returns `true` on activation.
    pub fn condition_match(&mut self, path: &str, object: &Object) -> bool {
        let hit = self.conditions.iter().position(|c| {
            c.path == path
                && object
                    .get(&c.interface)
                    .and_then(|props| props.get(&c.property))
                    .is_some_and(|value| c.accepts(value))
        });
        hit.is_some_and(|index| self.activate(index))
    }

    /// Same as [`Self::condition_match`], against each condition's recorded actual value.
    pub fn condition_match_actual(&mut self) -> bool {
        let hit = self
            .conditions
            .iter()
            .position(|c| c.actual_value.as_ref().is_some_and(|value| c.accepts(value)));
        hit.is_some_and(|index| self.activate(index))
    }

    fn activate(&mut self, index: usize) -> bool {
        let condition = self.conditions.swap_remove(index);
        self.conditions.clear();
        info!(
            path = %condition.path,
            interface = %condition.interface,
            property = %condition.property,
            file = %condition.file.display(),
            "Association condition met"
        );

        match rules::load_gated_rules(&condition.file, &self.root) {
            Ok(rules) => self.associations = rules,
            Err(err) => {
                error!(file = %condition.file.display(), error = %err, "Discarding gated associations");
            },
        }
        true
    }

    /// Creates the association interface for `path` from its rules, once.
    ///
    /// The first tuple creates the instance and announces it; later tuples append
    /// to it and publish the grown list. Both notifications follow `policy`.
    pub fn create_associations(&mut self, path: &str, policy: EmissionPolicy) {
        let Some(endpoints) = self.associations.get(path) else {
            return;
        };
        if !self.handled.insert(path.to_owned()) {
            return;
        }

        let tuples: Vec<Association> = endpoints
            .iter()
            .flat_map(|e| {
                e.paths.iter().map(|endpoint| {
                    (e.types.forward.clone(), e.types.reverse.clone(), endpoint.clone())
                })
            })
            .collect();

        for tuple in tuples {
            self.append(path, tuple, policy);
        }
    }

    fn append(&mut self, path: &str, tuple: Association, policy: EmissionPolicy) {
        debug!(%path, forward = %tuple.0, reverse = %tuple.1, endpoint = %tuple.2, "Association added");

        let created = !self.instances.contains_key(path);
        let list = self.instances.entry(path.to_owned()).or_default();
        list.push(tuple);
        if !policy.emits() {
            return;
        }

        let mut props = PropertyMap::new();
        props.insert(ASSOCIATIONS_PROPERTY.to_owned(), Value::Associations(list.clone()));
        // The forward path is normally hosted already; a new instance is one more interface on it.
        let signal = if created {
            let mut interfaces = Object::new();
            interfaces.insert(ASSOCIATION_INTERFACE.to_owned(), props);
            Signal::InterfacesAdded { path: path.to_owned(), interfaces }
        } else {
            Signal::PropertiesChanged {
                path: path.to_owned(),
                interface: ASSOCIATION_INTERFACE.to_owned(),
                changed: props,
            }
        };
        if let Err(err) = self.bus.emit(signal) {
            warn!(%path, error = %err, "Association signal not delivered");
        }
    }

    /// Drops the association instance of a forward path whose object was destroyed.
    ///
    /// Reverse references recorded elsewhere are left alone, and the path stays
    /// handled.
    pub fn remove(&mut self, path: &str) -> bool {
        self.instances.remove(path).is_some()
    }

    #[must_use]
    pub fn instance(&self, path: &str) -> Option<&[Association]> {
        self.instances.get(path).map(Vec::as_slice)
    }

    pub fn instances(&self) -> impl Iterator<Item = (&str, &[Association])> {
        self.instances.iter().map(|(p, a)| (p.as_str(), a.as_slice()))
    }

    /// The `Definitions` interface of `path` in bus form, if it has one.
    #[must_use]
    pub fn interface_snapshot(&self, path: &str) -> Option<PropertyMap> {
        self.instances.get(path).map(|list| {
            let mut props = PropertyMap::new();
            props.insert(ASSOCIATIONS_PROPERTY.to_owned(), Value::Associations(list.clone()));
            props
        })
    }

    /// Active rules, keyed by forward path.
    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.associations
    }
}
