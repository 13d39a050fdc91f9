//! Generic property values and the strict conversion into interface-typed fields.
//!
//! Conversion never coerces: an `Int32` is not an `Int64`, and a string is only
//! reinterpreted when the target is an enumeration that knows the string.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// One `(forward type, reverse type, endpoint path)` relationship tuple.
pub type Association = (String, String, String);

/// The closed set of property value types carried on the bus.
///
/// The serde form is adjacently tagged (`{"type": "int64", "value": 5}`) so that
/// declarative files can state the intended width explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    #[serde(rename = "boolean")]
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    String(String),
    Bytes(Vec<u8>),
    Strings(Vec<String>),
    Associations(Vec<Association>),
}

impl Value {
    /// The name of the alternative, as used in conversion errors and declarative files.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::UInt32(_) => "uint32",
            Self::UInt64(_) => "uint64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Strings(_) => "strings",
            Self::Associations(_) => "associations",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric value of any integer alternative, regardless of width.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::Int32(v) => Some(i128::from(v)),
            Self::Int64(v) => Some(i128::from(v)),
            Self::UInt32(v) => Some(i128::from(v)),
            Self::UInt64(v) => Some(i128::from(v)),
            _ => None,
        }
    }

    /// Equality that ignores integer width.
    ///
    /// Declarative files carry untyped JSON numbers, so a gate value of `1`
    /// must match an `Int32(1)` as well as a `UInt64(1)`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self.as_integer(), other.as_integer()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "{v:02x?}"),
            Self::Strings(v) => write!(f, "{v:?}"),
            Self::Associations(v) => write!(f, "{} association(s)", v.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Raised when a generic [`Value`] cannot be represented in the requested type.
#[pim_derive::pim_error]
pub enum ConversionError {
    #[error("Value type mismatch{}: {message}", format_context(.context))]
    Mismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unknown enumerator{}: {message}", format_context(.context))]
    UnknownEnumerator { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ConversionError {
    /// Builds a mismatch naming the offending value type.
    #[must_use]
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::Mismatch {
            message: format!("expected {expected}, found {}", found.type_name()).into(),
            context: None,
        }
    }
}

/// Strict conversion from a generic [`Value`] into a property field type.
pub trait FromValue: Sized {
    /// # Errors
    /// Returns [`ConversionError`] when the value is not one of the accepted alternatives.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

macro_rules! exact_conversions {
    ($($ty:ty => $variant:ident;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ConversionError::mismatch(
                            Value::$variant(Default::default()).type_name(),
                            &other,
                        )),
                    }
                }
            }
        )*
    };
}

exact_conversions! {
    bool => Bool;
    i32 => Int32;
    i64 => Int64;
    u32 => UInt32;
    u64 => UInt64;
    String => String;
    Vec<u8> => Bytes;
    Vec<String> => Strings;
    Vec<Association> => Associations;
}
