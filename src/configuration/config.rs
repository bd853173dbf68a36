use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::types::BackendKind;
use crate::error_handling::types::ConfigError;

/// Application configuration: which backend to use and where it lives.
///
/// Parsed from a TOML file; every field has a default so an empty file (or
/// no file at all) is valid. Capacity and record-count ceilings are fixed
/// per backend and deliberately not configurable here.
///
/// ```toml
/// backend = "document"
/// storage_dir = "/var/lib/videotheque"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Storage backend to open.
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory holding the backend's files.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self { backend: BackendKind::default(), storage_dir: default_storage_dir() }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Database);
        assert_eq!(config.storage_dir, PathBuf::from("."));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = \"document\"\nstorage_dir = \"/tmp/videos\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Document);
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/videos"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Database);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::TomlError(_))));
    }
}
