//! The type-erased interface seam.
//!
//! Concrete interfaces are plain structs with `#[derive(Interface)]`; the store
//! only ever sees them as `Box<dyn Interface>`.

use pim_domain::object::PropertyMap;
use pim_domain::value::{ConversionError, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;

/// A live interface instance hosted at some object path.
pub trait Interface: Any + fmt::Debug + Send + Sync {
    fn interface_name(&self) -> &'static str;

    /// Bus names of every property, in declaration order.
    fn property_names(&self) -> &'static [&'static str];

    fn property(&self, name: &str) -> Option<Value>;

    /// Validates that `value` could be assigned to `name` without assigning it.
    ///
    /// # Errors
    /// [`InterfaceError::UnknownProperty`] or [`InterfaceError::Conversion`].
    fn check_property(&self, name: &str, value: &Value) -> Result<(), InterfaceError>;

    /// Assigns one property. Returns `true` if the stored value changed.
    ///
    /// # Errors
    /// Same as [`Interface::check_property`]; the instance is untouched on error.
    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, InterfaceError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// All properties in bus form.
    fn properties(&self) -> PropertyMap {
        self.property_names()
            .iter()
            .filter_map(|name| self.property(name).map(|value| ((*name).to_owned(), value)))
            .collect()
    }
}

/// Static side of an interface: its bus name, default state and persisted form.
pub trait InterfaceSchema: Interface + Default + Serialize + DeserializeOwned {
    const NAME: &'static str;
}

/// Errors raised by a single interface instance.
#[pim_derive::pim_error]
pub enum InterfaceError {
    #[error("Property conversion failed{}: {source}", format_context(.context))]
    Conversion { source: ConversionError, context: Option<Cow<'static, str>> },

    #[error("Unknown property{}: {message}", format_context(.context))]
    UnknownProperty { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[doc(hidden)]
#[must_use]
pub fn conversion_failed(interface: &str, property: &str, source: ConversionError) -> InterfaceError {
    InterfaceError::Conversion { source, context: Some(format!("{interface}.{property}").into()) }
}

#[doc(hidden)]
#[must_use]
pub fn unknown_property(interface: &str, property: &str) -> InterfaceError {
    InterfaceError::UnknownProperty {
        message: property.to_owned().into(),
        context: Some(interface.to_owned().into()),
    }
}
