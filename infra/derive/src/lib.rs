#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the inventory manager workspace.
//!
//! * [`macro@pim_error`] turns an enum into a context-aware error type.
//! * [`macro@Interface`] turns a plain struct into a hosted inventory interface.
//! * [`macro@PropertyEnum`] maps an enum onto string enumerator values.
//! * [`macro@main`] bootstraps the Tokio runtime with a named profile.
//!
//! The generated code refers to `::pim_inventory` and `::pim_runtime`, so the
//! macros are meant to be consumed through those crates' re-exports. Examples are
//! `ignore`d here and exercised from the consuming crates' tests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Attribute macro to bootstrap the Tokio runtime for an `async fn main`.
///
/// # Arguments
///
/// * `current_thread` - A single-threaded scheduler; the message loop is serialized anyway.
/// * `high_performance` - A multithreaded scheduler tuned for throughput.
/// * `memory_efficient` - A multithreaded scheduler with half the workers and smaller stacks.
/// * `default` - Worker threads auto-detected from the available parallelism.
///
/// # Examples
///
/// ```rust,ignore
/// #[pim_runtime::main(current_thread)]
/// async fn main() -> anyhow::Result<()> {
/// # Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// A high-level attribute macro for defining domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source` field,
///   enabling the use of the `?` operator for upstream errors.
/// * **Internal Fallback**: Provides `From<&str>` and `From<String>` if an `Internal`
///   variant is present.
/// * **Introspection**: Adds `kind()` (the variant name) and `context_str()` accessors,
///   which the logging call sites use as structured fields.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants only.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping external errors must include a `source` field (or a field marked
///    `#[source]`/`#[from]`) next to the context field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[pim_derive::pim_error]
/// pub enum StorageError {
///     #[error("Hardware I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, StorageError> {
///     std::fs::read("inventory.bin").context("Reading inventory snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn pim_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Derives `pim_inventory::Interface` and `pim_inventory::InterfaceSchema` for a struct.
///
/// Every named field becomes a bus property. The property name defaults to the
/// field name in `PascalCase`; override it with `#[property(rename = "MACAddress")]`.
/// Field types must implement `FromValue`, `Clone`, `PartialEq` and convert into `Value`.
///
/// Unit structs and structs without fields produce property-less interfaces.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Interface)]
/// #[interface(name = "xyz.openbmc_project.Inventory.Item")]
/// pub struct Item {
///     pub pretty_name: String,
///     pub present: bool,
/// }
/// ```
#[proc_macro_derive(Interface, attributes(interface, property))]
pub fn derive_interface(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::interface::expand_derive(input).into()
}

/// Derives string enumerator support for a fieldless enum.
///
/// A variant is written to the bus as `<prefix>.<Variant>`. Reading accepts either
/// the fully-qualified form or the bare variant name; anything else is an
/// `UnknownEnumerator` conversion error.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PropertyEnum)]
/// #[property_enum(prefix = "xyz.openbmc_project.Inventory.Item.Chassis.ChassisType")]
/// pub enum ChassisType {
///     #[default]
///     Unknown,
///     RackMount,
/// }
/// ```
#[proc_macro_derive(PropertyEnum, attributes(property_enum))]
pub fn derive_property_enum(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::property_enum::expand_derive(input).into()
}
