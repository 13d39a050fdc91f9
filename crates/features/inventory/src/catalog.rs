//! Standard inventory interfaces.
//!
//! Each type is a plain struct whose fields are the interface's properties;
//! its serde form is the persisted form.

use crate::error::InventoryError;
use crate::registry::Registry;
use pim_derive::{Interface, PropertyEnum};
use serde::{Deserialize, Serialize};

/// Base interface of every inventory item.
#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Item")]
#[serde(rename_all = "PascalCase", default)]
pub struct Item {
    pub pretty_name: String,
    pub present: bool,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Decorator.Asset")]
#[serde(rename_all = "PascalCase", default)]
pub struct Asset {
    pub part_number: String,
    pub serial_number: String,
    pub manufacturer: String,
    pub build_date: String,
    pub model: String,
    pub sub_model: String,
    pub spare_part_number: String,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Decorator.Revision")]
#[serde(rename_all = "PascalCase", default)]
pub struct Revision {
    pub version: String,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Decorator.Compatible")]
#[serde(rename_all = "PascalCase", default)]
pub struct Compatible {
    pub names: Vec<String>,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Item.NetworkInterface")]
#[serde(default)]
pub struct NetworkInterface {
    #[property(rename = "MACAddress")]
    #[serde(rename = "MACAddress")]
    pub mac_address: String,
}

#[derive(PropertyEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[property_enum(prefix = "xyz.openbmc_project.Inventory.Item.Chassis.ChassisType")]
pub enum ChassisType {
    Component,
    Enclosure,
    Module,
    RackMount,
    StandAlone,
    #[default]
    Unknown,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Item.Chassis")]
#[serde(default)]
pub struct Chassis {
    #[property(rename = "Type")]
    #[serde(rename = "Type")]
    pub chassis_type: ChassisType,
}

/// A marker interface: hosting it is the whole statement.
#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Item.Board")]
pub struct Board;

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.Inventory.Item.Dimm")]
#[serde(rename_all = "PascalCase", default)]
pub struct Dimm {
    #[property(rename = "MemorySizeInKB")]
    #[serde(rename = "MemorySizeInKB")]
    pub memory_size_in_kb: u64,
    pub memory_data_width: u32,
}

#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "xyz.openbmc_project.State.Decorator.OperationalStatus")]
#[serde(rename_all = "PascalCase", default)]
pub struct OperationalStatus {
    pub functional: bool,
}

/// IBM VPD record `VINI`; keywords are raw bytes.
#[derive(Interface, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[interface(name = "com.ibm.ipzvpd.VINI")]
#[serde(default)]
pub struct Vini {
    #[property(rename = "RT")]
    #[serde(rename = "RT")]
    pub rt: Vec<u8>,
    #[property(rename = "DR")]
    #[serde(rename = "DR")]
    pub dr: Vec<u8>,
    #[property(rename = "PN")]
    #[serde(rename = "PN")]
    pub pn: Vec<u8>,
    #[property(rename = "SN")]
    #[serde(rename = "SN")]
    pub sn: Vec<u8>,
    #[property(rename = "CC")]
    #[serde(rename = "CC")]
    pub cc: Vec<u8>,
}

/// The registry the daemon serves by default.
///
/// # Errors
///
/// Only if two catalog entries claim the same interface name.
pub fn standard_registry() -> Result<Registry, InventoryError> {
    Registry::builder()
        .register::<Item>()
        .register::<Asset>()
        .register::<Revision>()
        .register::<Compatible>()
        .register::<NetworkInterface>()
        .register::<Chassis>()
        .register::<Board>()
        .register::<Dimm>()
        .register::<OperationalStatus>()
        .register::<Vini>()
        .build()
}
