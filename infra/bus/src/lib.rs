//! # Bus boundary
//!
//! The manager talks to the outside world through the [`Bus`] trait: it claims a
//! name, publishes object notifications, registers signal matches and performs
//! blocking method calls. Everything addressed to it arrives on one inbound
//! queue, so request handling stays serialized.
//!
//! ## Features
//!
//! * **Typed messages**: [`Signal`] for what the manager publishes, [`Message`] for
//!   what filters inspect, [`MethodCall`]/[`Reply`] for calls.
//! * **Match rules**: [`MatchRule`] parses and prints the `key='value'` form.
//! * **In-process bus**: [`LocalBus`] with `FxHashMap` + `parking_lot::RwLock`
//!   state and `tokio` channels.
//!
//! # Example
//!
//! ```rust
//! use pim_bus::{Bus, LocalBus, MatchRule, Message, Inbound};
//! use pim_domain::object::PropertyMap;
//!
//! # fn main() -> Result<(), pim_bus::BusError> {
//! let bus = LocalBus::new(":1.1");
//! let mut inbound = bus.inbound()?;
//! let id = bus.add_match(MatchRule::properties_changed("/a", "x.y.Z"))?;
//!
//! bus.publish(Message::properties_changed(":1.9", "/a", "x.y.Z", PropertyMap::new()));
//! match inbound.try_recv() {
//!     Ok(Inbound::Signal { matched, .. }) => assert_eq!(matched, id),
//!     other => panic!("unexpected {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod bus;
mod error;
mod local;
mod matching;
mod message;

pub use bus::{Bus, Inbound, ReplySender};
pub use error::{BusError, BusErrorExt};
pub use local::{LocalBus, Peer};
pub use matching::{MatchId, MatchRule};
pub use message::{Arg, Body, Message, MethodCall, Reply, Signal, names};
