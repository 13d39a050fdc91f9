//! # Inventory Manager
//!
//! Hosts inventory objects on a bus: each object path carries a set of typed
//! interfaces whose properties are persisted and announced as they change.
//!
//! ## Building blocks
//! * [`Registry`]: the closed table of interface types, one [`Maker`] each.
//! * [`ObjectStore`]: live interface instances by path.
//! * [`Manager`]: the merge engine, restore, event dispatch and the run loop.
//! * [`events`]: startup and signal events made of filters and actions.
//!
//! ## Example
//! ```rust,no_run
//! use pim_bus::LocalBus;
//! use pim_inventory::{Manager, catalog};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), pim_inventory::InventoryError> {
//! let mut manager = Manager::builder()
//!     .registry(catalog::standard_registry()?)
//!     .bus(Arc::new(LocalBus::default()))
//!     .build()?;
//! manager.run().await?;
//! # Ok(())
//! # }
//! ```

extern crate self as pim_inventory;

pub mod catalog;
mod error;
pub mod events;
pub mod interface;
mod manager;
mod persist;
mod registry;
mod store;

pub use error::{InventoryError, InventoryErrorExt};
pub use events::{Event, EventTable};
pub use interface::{Interface, InterfaceError, InterfaceSchema};
pub use manager::{Manager, ManagerBuilder, NoBus, WithBus};
pub use persist::Persistence;
pub use registry::{Maker, Registry, RegistryBuilder};
pub use store::{InterfaceComposite, ObjectStore};

pub use pim_derive::{Interface, PropertyEnum};
pub use pim_domain::object::{Object, ObjectMap, PropertyMap};
pub use pim_domain::value::{Association, ConversionError, FromValue, Value};
