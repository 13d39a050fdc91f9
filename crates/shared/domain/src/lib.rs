//! # Domain Models
//!
//! Pure inventory types with minimal dependencies (`serde`, plus the workspace error macro).
//! Keep it lean: no I/O, bus access, or persistence here, only data and simple helpers.

pub mod config;
pub mod object;
pub mod status;
pub mod value;
