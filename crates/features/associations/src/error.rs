use std::borrow::Cow;

/// A specialized [`AssociationError`] enum of this crate.
#[pim_derive::pim_error]
pub enum AssociationError {
    /// A rule or condition file is missing required fields or carries an unsupported value.
    #[error("Malformed association declaration{}: {message}", format_context(.context))]
    MalformedDeclaration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Association file I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}
