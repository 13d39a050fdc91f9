//! A sandboxed file store for per-object interface state.
//!
//! Every caller-supplied path is relative to the store root and is validated so it
//! can never escape it. Writes are atomic, so a crash mid-write leaves either the
//! previous payload or the new one, never a torn file.
//!
//! # Core Features
//!
//! - **Sandbox Security**: Lexical `..` collapsing plus physical canonicalization of the
//!   first existing ancestor, so symlinks cannot point outside the root.
//! - **Atomic Writes**: Unique temp file + `fsync` + `rename` + parent directory sync.
//! - **Segment Validation**: [`validate_segment`] rejects components that would change
//!   the shape of a path (`..`, separators, NUL).
//! - **Self-Healing**: Orphaned temp files older than five minutes are removed on open,
//!   along with directories left empty.
//! - **Enumeration**: [`Storage::files`] lists every stored file, which is how a restore
//!   pass rebuilds its skeleton.
//!
//! # Examples
//!
//! ```rust
//! use pim_storage::{Storage, StorageError};
//!
//! fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("state");
//!     let storage = Storage::builder().root(&root).create(true).open()?;
//!
//!     storage.write("system/chassis/xyz.openbmc_project.Inventory.Item", b"{}")?;
//!     let data = storage.read("system/chassis/xyz.openbmc_project.Inventory.Item")?;
//!     assert_eq!(data, b"{}");
//!
//!     assert_eq!(storage.files()?.len(), 1);
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::StorageBuilder;
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
pub use security::validate_segment;
