//! Configuration file loading

use crate::error::{Error, ErrorCode, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// A parsed configuration together with the file it came from
#[derive(Debug, Clone)]
pub struct ConfigFile<T> {
    /// Parsed schema
    pub schema: T,
    /// Path the schema was read from (`None` when defaults were used)
    pub path: Option<PathBuf>,
}

impl<T: DeserializeOwned + Default> ConfigFile<T> {
    /// Load configuration from an explicit path, or from the first existing
    /// candidate, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error; missing candidates
    /// are not.
    pub fn load(path: Option<&Path>, candidates: &[&str]) -> Result<Self> {
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::config_not_found(p));
            }
            return Ok(Self {
                schema: load_toml(p)?,
                path: Some(p.to_path_buf()),
            });
        }

        match find_config_file(candidates) {
            Some(found) => Ok(Self {
                schema: load_toml(&found)?,
                path: Some(found),
            }),
            None => Ok(Self::defaults()),
        }
    }

    /// Defaults only (no file)
    pub fn defaults() -> Self {
        Self {
            schema: T::default(),
            path: None,
        }
    }
}

/// Find the first existing configuration file among `candidates`
#[must_use]
pub fn find_config_file(candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

/// Read and parse a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::new(
            ErrorCode::ConfigError,
            format!("Failed to read config file {}: {e}", path.display()),
        )
        .with_source(e)
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::new(
            ErrorCode::ConfigParseError,
            format!("Failed to parse config file {}: {e}", path.display()),
        )
        .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default)]
        title: String,
        #[serde(default)]
        max_distance: f64,
    }

    #[test]
    fn test_load_defaults_when_nothing_found() {
        let config: ConfigFile<Sample> =
            ConfigFile::load(None, &["definitely-missing-gosend.toml"]).unwrap();
        assert!(config.path.is_none());
        assert!(config.schema.title.is_empty());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gosend.toml");
        std::fs::write(&path, "title = \"Instant\"\nmax_distance = 40.0\n").unwrap();

        let config: ConfigFile<Sample> = ConfigFile::load(Some(&path), &[]).unwrap();
        assert_eq!(config.schema.title, "Instant");
        assert_eq!(config.schema.max_distance, 40.0);
        assert_eq!(config.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err =
            ConfigFile::<Sample>::load(Some(Path::new("/nope/gosend.toml")), &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_parse_error_has_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "title = [unclosed").unwrap();

        let err = load_toml::<Sample>(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }
}
