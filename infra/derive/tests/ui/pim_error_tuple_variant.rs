use pim_derive::pim_error;

#[pim_error]
pub enum PersistError {
    #[error("I/O failure: {0}")]
    Io(std::io::Error),
}

fn main() {}
