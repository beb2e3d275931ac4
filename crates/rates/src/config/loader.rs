//! Settings file loading and environment overrides

use super::schema::Settings;
use gosend_core::config::ConfigFile;
use gosend_core::{Error, ErrorCode, Result};
use std::path::Path;

/// Places searched when no path is given
pub const CONFIG_CANDIDATES: [&str; 3] = ["gosend.toml", ".gosend.toml", ".config/gosend.toml"];

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "GOSEND_API_KEY";

/// Environment variable holding the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "GOSEND_TIMEOUT_SECS";

/// Load settings from `path` or the standard locations, then apply
/// environment overrides.
pub fn load(path: Option<&Path>) -> Result<ConfigFile<Settings>> {
    let mut config = ConfigFile::<Settings>::load(path, &CONFIG_CANDIDATES)?;
    apply_env(&mut config.schema, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Apply overrides read through `lookup`.
pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
        settings.api.key = key.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
        settings.api.timeout_secs = raw.trim().parse().map_err(|e| {
            Error::new(
                ErrorCode::ConfigError,
                format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}'"),
            )
            .with_source(e)
        })?;
    }

    Ok(())
}
