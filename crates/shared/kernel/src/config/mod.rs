use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Environment prefix for overrides, e.g. `PIM__BUS__ROOT=/testroot`.
pub const ENV_PREFIX: &str = "PIM";

/// Custom error type for config loading.
#[pim_derive::pim_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Layered configuration loader: an optional file overlaid by environment variables.
///
/// 1. **Base File**: when `path` is given the file must exist; its format is inferred
///    from the extension (`.toml`, `.json`, `.yaml`, ...). Without a path only the
///    struct defaults apply.
/// 2. **Environment Overrides**: variables prefixed with `PIM__` are overlaid, nested
///    keys separated by double underscores (`PIM__PERSISTENCE__PATH` maps to
///    `persistence.path`).
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or unreadable, or if the
/// merged document does not match `T`.
///
/// # Example
/// ```rust
/// use pim_kernel::config::load_config;
/// use pim_kernel::domain::config::ManagerConfig;
///
/// let cfg: ManagerConfig = load_config(None::<&str>).unwrap();
/// assert_eq!(cfg.bus.root, "/xyz/openbmc_project/inventory");
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = path.as_ref().map(AsRef::as_ref) {
        info!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(path).required(true));
    } else {
        info!("No configuration file given, using defaults");
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pim_domain::config::ManagerConfig;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("manager.toml");
        fs::write(
            &file,
            "[bus]\nroot = \"/testroot\"\n\n[persistence]\npath = \"/tmp/pim-state\"\ncreate = false\n",
        )
        .unwrap();

        let cfg: ManagerConfig = load_config(Some(&file)).unwrap();
        assert_eq!(cfg.bus.root, "/testroot");
        assert_eq!(cfg.bus.name, "xyz.openbmc_project.Inventory.Manager");
        assert!(!cfg.persistence.create);
        assert!(cfg.associations.enabled);
    }

    #[test]
    fn json_file_is_accepted() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("manager.json");
        fs::write(&file, r#"{ "associations": { "enabled": false } }"#).unwrap();

        let cfg: ManagerConfig = load_config(Some(&file)).unwrap();
        assert!(!cfg.associations.enabled);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_config::<ManagerConfig>(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert_eq!(err.kind(), "Config");
        assert_eq!(err.context_str(), Some("Failed to build config"));
    }
}
