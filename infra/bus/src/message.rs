//! Wire-level shapes: signal messages, outbound notifications and method calls.

use pim_domain::object::{Object, ObjectMap, PropertyMap};
use pim_domain::value::Value;
use std::collections::BTreeMap;

/// Well-known interface, member and service names.
pub mod names {
    pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
    pub const OBJECT_MANAGER: &str = "org.freedesktop.DBus.ObjectManager";
    pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";
    pub const INTERFACES_ADDED: &str = "InterfacesAdded";
    pub const INTERFACES_REMOVED: &str = "InterfacesRemoved";
    pub const GET: &str = "Get";
    pub const GET_ALL: &str = "GetAll";
    pub const SET: &str = "Set";
    pub const GET_MANAGED_OBJECTS: &str = "GetManagedObjects";

    pub const INVENTORY_MANAGER: &str = "xyz.openbmc_project.Inventory.Manager";
    pub const NOTIFY: &str = "Notify";

    pub const MAPPER_SERVICE: &str = "xyz.openbmc_project.ObjectMapper";
    pub const MAPPER_PATH: &str = "/xyz/openbmc_project/object_mapper";
    pub const MAPPER_INTERFACE: &str = "xyz.openbmc_project.ObjectMapper";
    pub const MAPPER_GET_OBJECT: &str = "GetObject";
}

/// Typed payload of a signal message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    PropertiesChanged { interface: String, changed: PropertyMap, invalidated: Vec<String> },
    InterfacesAdded { path: String, interfaces: Object },
    InterfacesRemoved { path: String, interfaces: Vec<String> },
    Args(Vec<Value>),
}

/// A signal as seen by match rules and filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub body: Body,
}

impl Message {
    /// The first body argument when it is a string, which is what `arg0` rules match.
    #[must_use]
    pub fn arg0(&self) -> Option<&str> {
        match &self.body {
            Body::PropertiesChanged { interface, .. } => Some(interface),
            Body::InterfacesAdded { path, .. } | Body::InterfacesRemoved { path, .. } => Some(path),
            Body::Args(args) => args.first().and_then(Value::as_str),
            Body::Empty => None,
        }
    }

    /// Builds a `PropertiesChanged` message, the shape most filters consume.
    #[must_use]
    pub fn properties_changed(
        sender: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        changed: PropertyMap,
    ) -> Self {
        Self {
            sender: sender.into(),
            path: path.into(),
            interface: names::PROPERTIES.to_owned(),
            member: names::PROPERTIES_CHANGED.to_owned(),
            body: Body::PropertiesChanged {
                interface: interface.into(),
                changed,
                invalidated: Vec::new(),
            },
        }
    }
}

/// Notifications the manager publishes about the objects it hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A brand-new path, with its complete interface and property snapshot.
    ObjectAdded { path: String, interfaces: Object },
    /// New interfaces on an existing path; only those interfaces are listed.
    InterfacesAdded { path: String, interfaces: Object },
    /// A path was torn down; lists the interfaces it carried.
    ObjectRemoved { path: String, interfaces: Vec<String> },
    /// Changed subset of one interface's properties.
    PropertiesChanged { path: String, interface: String, changed: PropertyMap },
}

impl Signal {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::ObjectAdded { path, .. }
            | Self::InterfacesAdded { path, .. }
            | Self::ObjectRemoved { path, .. }
            | Self::PropertiesChanged { path, .. } => path,
        }
    }

    /// Lowers the notification onto the standard interfaces.
    ///
    /// Object-level notifications travel as `ObjectManager` signals from
    /// `manager_path`; property changes travel from the object itself.
    #[must_use]
    pub fn to_message(&self, sender: &str, manager_path: &str) -> Message {
        let (path, interface, member, body) = match self.clone() {
            Self::ObjectAdded { path, interfaces } | Self::InterfacesAdded { path, interfaces } => (
                manager_path.to_owned(),
                names::OBJECT_MANAGER,
                names::INTERFACES_ADDED,
                Body::InterfacesAdded { path, interfaces },
            ),
            Self::ObjectRemoved { path, interfaces } => (
                manager_path.to_owned(),
                names::OBJECT_MANAGER,
                names::INTERFACES_REMOVED,
                Body::InterfacesRemoved { path, interfaces },
            ),
            Self::PropertiesChanged { path, interface, changed } => (
                path,
                names::PROPERTIES,
                names::PROPERTIES_CHANGED,
                Body::PropertiesChanged { interface, changed, invalidated: Vec::new() },
            ),
        };

        Message {
            sender: sender.to_owned(),
            path,
            interface: interface.to_owned(),
            member: member.to_owned(),
            body,
        }
    }
}

/// A method call argument or reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Value(Value),
    Properties(PropertyMap),
    Objects(ObjectMap),
    /// Service name to the interfaces it implements, as returned by the mapper.
    Owners(BTreeMap<String, Vec<String>>),
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

/// An outbound or inbound method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub destination: String,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<Arg>,
}

impl MethodCall {
    #[must_use]
    pub fn new(
        destination: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            path: path.into(),
            interface: interface.into(),
            member: member.into(),
            args: Vec::new(),
        }
    }

    #[must_use = "Appends an argument to the call"]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `org.freedesktop.DBus.Properties.Get(interface, property)`.
    #[must_use]
    pub fn get_property(
        destination: impl Into<String>,
        path: impl Into<String>,
        interface: &str,
        property: &str,
    ) -> Self {
        Self::new(destination, path, names::PROPERTIES, names::GET).arg(interface).arg(property)
    }

    /// `xyz.openbmc_project.ObjectMapper.GetObject(path, [interface])`.
    #[must_use]
    pub fn get_object(path: &str, interface: &str) -> Self {
        Self::new(
            names::MAPPER_SERVICE,
            names::MAPPER_PATH,
            names::MAPPER_INTERFACE,
            names::MAPPER_GET_OBJECT,
        )
        .arg(path)
        .arg(Value::Strings(vec![interface.to_owned()]))
    }

    /// The string value at `index`, if the argument has that shape.
    #[must_use]
    pub fn str_arg(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(Arg::Value(value)) => value.as_str(),
            _ => None,
        }
    }
}

/// The successful answer to a [`MethodCall`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub args: Vec<Arg>,
}

impl Reply {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(arg: impl Into<Arg>) -> Self {
        Self { args: vec![arg.into()] }
    }

    #[must_use]
    pub fn first_value(&self) -> Option<&Value> {
        match self.args.first() {
            Some(Arg::Value(value)) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn owners(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self.args.first() {
            Some(Arg::Owners(owners)) => Some(owners),
            _ => None,
        }
    }
}

impl From<PropertyMap> for Arg {
    fn from(value: PropertyMap) -> Self {
        Self::Properties(value)
    }
}

impl From<ObjectMap> for Arg {
    fn from(value: ObjectMap) -> Self {
        Self::Objects(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_signals_lower_to_object_manager() {
        let mut interfaces = Object::new();
        interfaces.insert("IfaceA".to_owned(), PropertyMap::new());
        let signal = Signal::ObjectAdded { path: "/testroot/foo".to_owned(), interfaces };

        let msg = signal.to_message(":1.7", "/testroot");
        assert_eq!(msg.path, "/testroot");
        assert_eq!(msg.interface, names::OBJECT_MANAGER);
        assert_eq!(msg.member, names::INTERFACES_ADDED);
        assert_eq!(msg.arg0(), Some("/testroot/foo"));
    }

    #[test]
    fn property_signals_lower_to_the_object_path() {
        let mut changed = PropertyMap::new();
        changed.insert("Prop1".to_owned(), Value::from("y"));
        let signal = Signal::PropertiesChanged {
            path: "/testroot/foo".to_owned(),
            interface: "IfaceA".to_owned(),
            changed,
        };

        let msg = signal.to_message(":1.7", "/testroot");
        assert_eq!(msg.path, "/testroot/foo");
        assert_eq!(msg.member, names::PROPERTIES_CHANGED);
        assert_eq!(msg.arg0(), Some("IfaceA"));
    }
}
