use crate::events::EventError;
use crate::interface::InterfaceError;
use pim_bus::BusError;
use pim_storage::StorageError;
use std::borrow::Cow;

/// A specialized [`InventoryError`] enum of this crate.
#[pim_derive::pim_error]
pub enum InventoryError {
    /// The interface name has no registry entry.
    #[error("Unsupported interface{}: {message}", format_context(.context))]
    UnsupportedInterface { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The path, interface or property is not hosted here.
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A typed access named a Rust type other than the one registered for the interface.
    #[error("Interface type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Builder input that cannot produce a working manager.
    #[error("Invalid manager setup{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Interface rejected the update{}: {source}", format_context(.context))]
    Interface { source: InterfaceError, context: Option<Cow<'static, str>> },

    #[error("Persistence failure{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Bus failure{}: {source}", format_context(.context))]
    Bus { source: BusError, context: Option<Cow<'static, str>> },

    #[error("Event table error{}: {source}", format_context(.context))]
    Event { source: EventError, context: Option<Cow<'static, str>> },

    #[error("Corrupt persisted state{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

impl InventoryError {
    pub(crate) fn not_found(path: &str, interface: &str) -> Self {
        Self::NotFound { message: format!("{path} {interface}").into(), context: None }
    }

    pub(crate) fn type_mismatch(interface: &str, requested: &'static str) -> Self {
        Self::TypeMismatch {
            message: interface.to_owned().into(),
            context: Some(format!("requested {requested}").into()),
        }
    }
}
