use std::borrow::Cow;

/// Errors that can occur at the bus boundary.
#[pim_derive::pim_error]
#[derive(Clone)]
pub enum BusError {
    /// A match string could not be parsed.
    #[error("Invalid match rule{}: {message}", format_context(.context))]
    InvalidMatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Nobody owns the destination of a method call.
    #[error("Unknown service{}: {message}", format_context(.context))]
    UnknownService { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The remote side answered with an error, or the call could not be completed.
    #[error("Remote call failed{}: {message}", format_context(.context))]
    RemoteCall { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The requested well-known name is owned by another connection.
    #[error("Name already owned{}: {message}", format_context(.context))]
    NameTaken { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The inbound queue was already handed out or has been closed.
    #[error("Inbound channel unavailable{}: {message}", format_context(.context))]
    ChannelClosed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A method was dispatched to an object, interface or member that does not exist.
    #[error("Unknown method{}: {message}", format_context(.context))]
    UnknownMethod { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Method arguments did not have the expected shape.
    #[error("Invalid arguments{}: {message}", format_context(.context))]
    InvalidArgs { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
