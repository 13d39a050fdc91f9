use pim_derive::pim_error;
use std::borrow::Cow;

#[pim_error]
pub enum PersistError {
    #[error("I/O failure{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown interface{}: {message}", format_context(.context))]
    UnknownInterface { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<Vec<u8>, PersistError> {
    std::fs::read("/nonexistent/inventory").context("reading snapshot")
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.kind(), "Io");
    assert_eq!(err.context_str(), Some("reading snapshot"));

    let internal: PersistError = "boom".into();
    assert_eq!(internal.kind(), "Internal");
    assert_eq!(internal.context_str(), None);
}
