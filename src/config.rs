//! Configuration for the schema index
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-index.toml)
//! - Environment variables (SCHEMA_INDEX__*)
//!
//! ## Example config file (schema-index.toml):
//! ```toml
//! [storage]
//! backend = "fs"
//! path = "./index"
//!
//! [import]
//! reserved_namespace = "_any"
//! root_entries = "reject"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::bundle::RootEntryPolicy;

/// Main configuration for the schema index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Import settings
    #[serde(default)]
    pub import: ImportConfig,
}

/// Which storage backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the fs backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Namespace value meaning "any namespace", never a valid import target
    #[serde(default = "default_reserved_namespace")]
    pub reserved_namespace: String,

    /// Handling of bundles with several root-level files
    #[serde(default)]
    pub root_entries: RootEntryPolicy,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("index")
}

fn default_reserved_namespace() -> String {
    "_any".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            reserved_namespace: default_reserved_namespace(),
            root_entries: RootEntryPolicy::default(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-index.toml",
            ".schema-index.toml",
            "config/schema-index.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-index", "schema-index") {
            let xdg_config = config_dir.config_dir().join("schema-index.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_INDEX")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the storage path (resolves relative paths)
    pub fn storage_path(&self) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.storage.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.import.reserved_namespace, "_any");
        assert_eq!(config.import.root_entries, RootEntryPolicy::Reject);
        assert_eq!(config.storage.backend, StorageBackend::Fs);
    }

    #[test]
    fn test_serialize_config() {
        let config = IndexConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[import]"));
        assert!(toml_str.contains("root_entries = \"reject\""));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"memory\"\n\n[import]\nroot_entries = \"last_wins\"\n",
        )
        .unwrap();

        let config = IndexConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.import.root_entries, RootEntryPolicy::LastWins);
        assert_eq!(config.import.reserved_namespace, "_any");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");

        let mut config = IndexConfig::default();
        config.storage.path = PathBuf::from("/srv/schema-index");
        config.import.reserved_namespace = "*".to_string();
        config.import.root_entries = RootEntryPolicy::LastWins;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = IndexConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.storage.path, PathBuf::from("/srv/schema-index"));
        assert_eq!(loaded.import.reserved_namespace, "*");
        assert_eq!(loaded.import.root_entries, RootEntryPolicy::LastWins);
    }
}
