//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it re-exports the domain model and the config loader.
//!
//! ## Config loading
//! ```rust,ignore
//! use pim_kernel::config::load_config;
//! use pim_kernel::domain::config::ManagerConfig;
//!
//! let cfg: ManagerConfig = load_config(Some("/etc/phosphor-inventory-manager/manager.toml"))?;
//! ```

pub mod config;

pub use pim_domain as domain;
