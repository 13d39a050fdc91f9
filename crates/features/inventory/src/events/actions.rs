use super::{Action, PathCondition};
use crate::error::InventoryError;
use crate::manager::Manager;
use pim_bus::Bus;
use pim_domain::object::{ObjectMap, absolize};
use pim_domain::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl Action for NoopAction {
    fn run(&self, _bus: &dyn Bus, _manager: &mut Manager) -> Result<(), InventoryError> {
        Ok(())
    }
}

/// Feeds a fixed batch to the merge engine.
#[derive(Debug, Clone, Default)]
pub struct CreateObjects {
    pub objects: ObjectMap,
}

impl Action for CreateObjects {
    fn run(&self, _bus: &dyn Bus, manager: &mut Manager) -> Result<(), InventoryError> {
        manager.create_objects(self.objects.clone());
        Ok(())
    }
}

/// Removes every listed path whose conditions all hold.
#[derive(Debug, Default)]
pub struct DestroyObjects {
    pub paths: Vec<String>,
    pub conditions: Vec<Box<dyn PathCondition>>,
}

impl Action for DestroyObjects {
    fn run(&self, bus: &dyn Bus, manager: &mut Manager) -> Result<(), InventoryError> {
        let selected = select(&self.paths, &self.conditions, bus, manager);
        manager.destroy_objects(&selected);
        Ok(())
    }
}

/// Assigns one property on every listed path whose conditions all hold.
#[derive(Debug)]
pub struct SetProperty {
    pub paths: Vec<String>,
    pub conditions: Vec<Box<dyn PathCondition>>,
    pub interface: String,
    pub property: String,
    pub value: Value,
}

impl Action for SetProperty {
    fn run(&self, bus: &dyn Bus, manager: &mut Manager) -> Result<(), InventoryError> {
        for path in select(&self.paths, &self.conditions, bus, manager) {
            manager.set_property(&path, &self.interface, &self.property, self.value.clone())?;
        }
        Ok(())
    }
}

fn select(
    paths: &[String],
    conditions: &[Box<dyn PathCondition>],
    bus: &dyn Bus,
    manager: &mut Manager,
) -> Vec<String> {
    let root = manager.root().to_owned();
    paths
        .iter()
        .filter(|path| {
            let path = absolize(&root, path);
            conditions.iter().all(|c| c.check(&path, bus, manager))
        })
        .cloned()
        .collect()
}
