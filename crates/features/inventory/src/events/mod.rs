//! The event engine's data: triggers, filters and actions.
//!
//! An [`Event`] runs its filters in order, stopping at the first `false`, then
//! its actions in order. A failing action drops the rest of that event only.

mod actions;
mod error;
mod filters;
mod spec;

pub use actions::{CreateObjects, DestroyObjects, NoopAction, SetProperty};
pub use error::{EventError, EventErrorExt};
pub use filters::{NoopFilter, PropertyChangedTo, PropertyIs};
pub use spec::{ActionSpec, ConditionSpec, EventFile, EventSpec, FilterSpec};

use crate::error::InventoryError;
use crate::manager::Manager;
use pim_bus::{Bus, Message};
use std::fmt;
use std::path::Path;

/// A predicate over the triggering message and the manager state.
pub trait Filter: Send + Sync {
    /// `message` is `None` for startup events.
    fn evaluate(&self, bus: &dyn Bus, message: Option<&Message>, manager: &mut Manager) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&dyn Bus, Option<&Message>, &mut Manager) -> bool + Send + Sync,
{
    fn evaluate(&self, bus: &dyn Bus, message: Option<&Message>, manager: &mut Manager) -> bool {
        self(bus, message, manager)
    }
}

/// A step run once every filter of its event passed.
pub trait Action: Send + Sync {
    /// # Errors
    /// Any failure; the engine logs it and skips the event's remaining actions.
    fn run(&self, bus: &dyn Bus, manager: &mut Manager) -> Result<(), InventoryError>;
}

impl<F> Action for F
where
    F: Fn(&dyn Bus, &mut Manager) -> Result<(), InventoryError> + Send + Sync,
{
    fn run(&self, bus: &dyn Bus, manager: &mut Manager) -> Result<(), InventoryError> {
        self(bus, manager)
    }
}

/// A per-path guard evaluated by actions that fan out over several paths.
pub trait PathCondition: fmt::Debug + Send + Sync {
    fn check(&self, path: &str, bus: &dyn Bus, manager: &mut Manager) -> bool;
}

/// What makes an event fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Once, before the service becomes reachable.
    Startup,
    /// Every signal matching this match string.
    Signal(String),
}

pub struct Event {
    name: String,
    trigger: Trigger,
    filters: Vec<Box<dyn Filter>>,
    actions: Vec<Box<dyn Action>>,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("filters", &self.filters.len())
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl Event {
    #[must_use]
    pub fn startup(name: impl Into<String>) -> Self {
        Self::new(name, Trigger::Startup)
    }

    #[must_use]
    pub fn on_signal(name: impl Into<String>, match_rule: impl Into<String>) -> Self {
        Self::new(name, Trigger::Signal(match_rule.into()))
    }

    fn new(name: impl Into<String>, trigger: Trigger) -> Self {
        Self { name: name.into(), trigger, filters: Vec::new(), actions: Vec::new() }
    }

    #[must_use = "Appends a filter to the event"]
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    #[must_use = "Appends an action to the event"]
    pub fn action(mut self, action: impl Action + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    #[must_use]
    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    #[must_use]
    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }
}

/// The ordered, immutable list of events handed to the manager.
#[derive(Debug, Default)]
pub struct EventTable {
    events: Vec<Event>,
}

impl EventTable {
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Compiles a declarative event file.
    ///
    /// # Errors
    ///
    /// [`EventError::MalformedDeclaration`] for an unreadable document or an event
    /// without signatures, [`EventError::InvalidMatch`] for a bad signature.
    pub fn from_json(data: &[u8]) -> Result<Self, EventError> {
        let file: EventFile = serde_json::from_slice(data).map_err(|err| {
            EventError::MalformedDeclaration { message: err.to_string().into(), context: None }
        })?;
        file.compile().map(Self::new)
    }

    /// # Errors
    /// Same as [`Self::from_json`], plus [`EventError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, EventError> {
        let data = std::fs::read(path).context(format!("Failed to read {}", path.display()))?;
        Self::from_json(&data).context(path.display().to_string())
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
