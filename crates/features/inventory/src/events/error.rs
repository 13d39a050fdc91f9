use pim_bus::BusError;
use std::borrow::Cow;

/// Errors raised while building an event table.
#[pim_derive::pim_error]
pub enum EventError {
    /// A declarative event is missing required fields or names an unknown filter or action.
    #[error("Malformed event declaration{}: {message}", format_context(.context))]
    MalformedDeclaration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid event match{}: {source}", format_context(.context))]
    InvalidMatch { source: BusError, context: Option<Cow<'static, str>> },

    #[error("Event file I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}
