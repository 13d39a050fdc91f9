#![allow(dead_code)]

use pim_bus::{LocalBus, Signal};
use pim_domain::config::ManagerConfig;
use pim_inventory::{
    Association, EventTable, Interface, Manager, Object, ObjectMap, PropertyMap, Registry, Value,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

pub const ROOT: &str = "/testroot";

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "IfaceA")]
#[serde(rename_all = "PascalCase", default)]
pub struct IfaceA {
    pub prop1: String,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "IfaceB")]
#[serde(rename_all = "PascalCase", default)]
pub struct IfaceB {
    pub prop2: i64,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "IfaceC")]
#[serde(rename_all = "PascalCase", default)]
pub struct IfaceC {
    pub prop3: bool,
}

/// No properties at all.
#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "IfaceD")]
pub struct IfaceD;

/// Claims `IfaceA` but is never registered.
#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "IfaceA")]
pub struct Impostor {
    pub prop1: String,
}

/// One field of every supported property type.
#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "Fixture.AllTypes")]
#[serde(rename_all = "PascalCase", default)]
pub struct AllTypes {
    pub flag: bool,
    pub small: i32,
    pub big: i64,
    pub count: u32,
    pub total: u64,
    pub text: String,
    pub raw: Vec<u8>,
    pub names: Vec<String>,
    pub links: Vec<Association>,
}

#[must_use]
pub fn registry() -> Registry {
    Registry::builder()
        .register::<IfaceA>()
        .register::<IfaceB>()
        .register::<IfaceC>()
        .register::<IfaceD>()
        .register::<AllTypes>()
        .build()
        .unwrap()
}

#[must_use]
pub fn config(dir: &Path) -> ManagerConfig {
    let mut config = ManagerConfig::default();
    config.bus.root = ROOT.to_owned();
    config.persistence.path = dir.join("state");
    config.associations.enabled = false;
    config
}

/// Builds a manager with the fixture registry.
/// # Panics
/// * If the manager cannot be built.
#[must_use]
pub fn manager(config: ManagerConfig, bus: &LocalBus, events: EventTable) -> Manager {
    Manager::builder()
        .config(config)
        .registry(registry())
        .events(events)
        .bus(Arc::new(bus.clone()))
        .build()
        .expect("Manager setup failed")
}

#[must_use]
pub fn props(pairs: &[(&str, Value)]) -> PropertyMap {
    pairs.iter().map(|(name, value)| ((*name).to_owned(), value.clone())).collect()
}

#[must_use]
pub fn object(interfaces: &[(&str, PropertyMap)]) -> Object {
    interfaces.iter().map(|(name, props)| ((*name).to_owned(), props.clone())).collect()
}

#[must_use]
pub fn batch(path: &str, object: Object) -> ObjectMap {
    let mut objects = ObjectMap::new();
    objects.insert(path.to_owned(), object);
    objects
}

/// The `/foo` object of the reference scenario.
#[must_use]
pub fn foo() -> ObjectMap {
    batch(
        "/foo",
        object(&[
            ("IfaceA", props(&[("Prop1", Value::from("x"))])),
            ("IfaceB", props(&[("Prop2", Value::Int64(5))])),
        ]),
    )
}

/// Everything emitted so far.
pub fn drain(signals: &mut broadcast::Receiver<Arc<Signal>>) -> Vec<Signal> {
    let mut out = Vec::new();
    loop {
        match signals.try_recv() {
            Ok(signal) => out.push((*signal).clone()),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
            Err(TryRecvError::Lagged(_)) => {},
        }
    }
}

#[must_use]
pub fn interface_names(manager: &Manager, path: &str) -> Vec<String> {
    manager.store().interface_names(path)
}

#[must_use]
pub fn a_value(manager: &Manager, path: &str) -> Option<String> {
    manager.interface::<IfaceA>(path).ok().map(|a| a.prop1.clone())
}

pub fn assert_hosts(manager: &Manager, path: &str, interface: &str) {
    assert!(
        manager.store().interface(path, interface).is_some_and(|i| i.interface_name() == interface),
        "{path} does not host {interface}"
    );
}
