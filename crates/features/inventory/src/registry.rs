//! Makers: the static table of interface types the manager can host.

use crate::error::InventoryError;
use crate::interface::{Interface, InterfaceError, InterfaceSchema};
use pim_domain::object::PropertyMap;
use pim_domain::value::Value;
use std::any::TypeId;

/// Type-erased operations for one interface type.
///
/// Each entry is a set of plain function pointers monomorphized for the
/// concrete type, so the table is `Copy` and needs no allocation per lookup.
#[derive(Debug, Clone, Copy)]
pub struct Maker {
    name: &'static str,
    type_name: &'static str,
    type_id: fn() -> TypeId,
    make: fn() -> Box<dyn Interface>,
    encode: fn(&dyn Interface) -> Result<Vec<u8>, InventoryError>,
    decode: fn(&[u8], &mut dyn Interface) -> Result<(), InventoryError>,
}

impl Maker {
    #[must_use]
    pub fn of<T: InterfaceSchema>() -> Self {
        Self {
            name: T::NAME,
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>,
            make: make::<T>,
            encode: encode::<T>,
            decode: decode::<T>,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if `T` is the concrete type behind this entry.
    #[must_use]
    pub fn is<T: InterfaceSchema>(&self) -> bool {
        (self.type_id)() == TypeId::of::<T>()
    }

    /// Builds a default instance and applies `properties` to it.
    ///
    /// # Errors
    ///
    /// Returns the first [`InterfaceError`]; the half-built instance is dropped.
    pub fn construct(&self, properties: &PropertyMap) -> Result<Box<dyn Interface>, InterfaceError> {
        let mut handle = (self.make)();
        for (name, value) in properties {
            handle.set_property(name, value.clone())?;
        }
        Ok(handle)
    }

    /// Applies `properties` to an existing instance, all or nothing.
    ///
    /// Returns the subset whose value actually changed.
    ///
    /// # Errors
    ///
    /// Returns the first [`InterfaceError`]; no property is assigned in that case.
    pub fn assign(
        &self,
        properties: &PropertyMap,
        handle: &mut dyn Interface,
    ) -> Result<PropertyMap, InterfaceError> {
        for (name, value) in properties {
            handle.check_property(name, value)?;
        }

        let mut changed = PropertyMap::new();
        for (name, value) in properties {
            if handle.set_property(name, value.clone())? {
                changed.insert(name.clone(), value.clone());
            }
        }
        Ok(changed)
    }

    /// Encodes the persisted form. Interfaces without properties encode to nothing.
    ///
    /// # Errors
    ///
    /// [`InventoryError::TypeMismatch`] if `handle` was not made by this entry.
    pub fn serialize(&self, handle: &dyn Interface) -> Result<Vec<u8>, InventoryError> {
        (self.encode)(handle)
    }

    /// Replaces the state of `handle` with a persisted form. Empty input keeps defaults.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Serialization`] for a corrupt payload; `handle` is untouched.
    pub fn deserialize(&self, data: &[u8], handle: &mut dyn Interface) -> Result<(), InventoryError> {
        (self.decode)(data, handle)
    }

    /// Reads one property back in generic form.
    #[must_use]
    pub fn get_property(&self, name: &str, handle: &dyn Interface) -> Option<Value> {
        handle.property(name)
    }
}

fn make<T: InterfaceSchema>() -> Box<dyn Interface> {
    Box::new(T::default())
}

fn encode<T: InterfaceSchema>(handle: &dyn Interface) -> Result<Vec<u8>, InventoryError> {
    let typed = handle
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| InventoryError::type_mismatch(T::NAME, std::any::type_name::<T>()))?;
    if typed.property_names().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::to_vec_pretty(typed)?)
}

fn decode<T: InterfaceSchema>(data: &[u8], handle: &mut dyn Interface) -> Result<(), InventoryError> {
    let slot = handle
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| InventoryError::type_mismatch(T::NAME, std::any::type_name::<T>()))?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    *slot = serde_json::from_slice(data)?;
    Ok(())
}

/// Immutable, name-sorted table of [`Maker`]s.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    makers: Vec<Maker>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Binary-searches the table.
    ///
    /// # Errors
    ///
    /// [`InventoryError::UnsupportedInterface`] for an unknown name.
    pub fn get(&self, name: &str) -> Result<&Maker, InventoryError> {
        self.makers
            .binary_search_by(|m| m.name.cmp(name))
            .map(|index| &self.makers[index])
            .map_err(|_| InventoryError::UnsupportedInterface {
                message: name.to_owned().into(),
                context: None,
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Interface names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.makers.iter().map(|m| m.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.makers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    makers: Vec<Maker>,
}

impl RegistryBuilder {
    #[must_use = "Adds an interface type to the registry"]
    pub fn register<T: InterfaceSchema>(self) -> Self {
        self.maker(Maker::of::<T>())
    }

    #[must_use = "Adds a maker to the registry"]
    pub fn maker(mut self, maker: Maker) -> Self {
        self.makers.push(maker);
        self
    }

    /// Sorts the table and freezes it.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Validation`] if two makers share an interface name.
    pub fn build(mut self) -> Result<Registry, InventoryError> {
        self.makers.sort_by(|a, b| a.name.cmp(b.name));
        if let Some(pair) = self.makers.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(InventoryError::Validation {
                message: pair[0].name.into(),
                context: Some(
                    format!("registered by both {} and {}", pair[0].type_name, pair[1].type_name)
                        .into(),
                ),
            });
        }
        Ok(Registry { makers: self.makers })
    }
}
