use pim_derive::pim_error;

#[pim_error]
pub enum PersistError {
    #[error("I/O failure: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<String>,
    },
}

fn main() {}
