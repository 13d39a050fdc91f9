//! # Associations
//!
//! Derives `xyz.openbmc_project.Association.Definitions` interfaces for inventory
//! paths from declarative rule files.
//!
//! A rule names a forward path and, per relationship type pair, the endpoint
//! paths it points at. Rules may be gated: a condition file names a property
//! that must hold one of a set of values before its `associations` block is
//! activated. The first satisfied condition wins and the others are discarded.
//!
//! ```json
//! [{"path": "system/chassis",
//!   "endpoints": [{"types": {"fType": "inventory", "rType": "chassis"},
//!                  "paths": ["system/chassis/motherboard"]}]}]
//! ```

mod error;
mod manager;
pub mod rules;

pub use error::{AssociationError, AssociationErrorExt};
pub use manager::{
    ASSOCIATION_INTERFACE, ASSOCIATIONS_PROPERTY, AssociationManager, AssociationManagerBuilder,
};
pub use rules::{Condition, Endpoint, Rules, Types};
