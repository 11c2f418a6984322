//! Application configuration structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::exporter::FileExporterConfig;

use super::receivers::ReceiversConfig;
use super::validation::ConfigError;

// =============================================================================
// Exporter Configuration
// =============================================================================

/// Exporters by kind. With no exporter configured, batches are logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportersConfig {
    /// JSON-lines file exporter.
    #[serde(default)]
    pub file: Option<FileExporterConfig>,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Receiver definitions grouped by kind.
    #[serde(default)]
    pub receivers: ReceiversConfig,

    /// Exporter definitions.
    #[serde(default)]
    pub exporters: ExportersConfig,

    /// Directory with additional receiver config files.
    #[serde(default)]
    pub receiver_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and merge receivers found under `receiver_path`.
    ///
    /// A relative `receiver_path` is resolved against the config file's directory.
    pub fn load_with_receiver_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;

        if let Some(dir) = &config.receiver_path {
            let dir = match path.parent() {
                Some(base) if dir.is_relative() => base.join(dir),
                _ => dir.clone(),
            };
            let extra = ReceiversConfig::load_from_dir(&dir)?;
            tracing::debug!(path = %dir.display(), receivers = extra.len(), "Merged receiver directory");
            config.receivers = config.receivers.merge(extra);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.receivers.validate()?;
        if let Some(file) = &self.exporters.file {
            file.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::aerospike::AerospikeConfig;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_valid() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert!(config.receivers.is_empty());
        assert!(config.exporters.file.is_none());
    }

    #[test]
    fn test_file_exporter_requires_path() {
        let config = AppConfig {
            exporters: ExportersConfig {
                file: Some(FileExporterConfig::new("")),
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("path must be non-empty"));
    }

    #[test]
    fn test_receiver_errors_propagate() {
        let mut config = AppConfig::default();
        config.receivers.aerospike.push(
            AerospikeConfig::new("as-1", "localhost:3000").with_timeout(std::time::Duration::ZERO),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/telescrape.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_load_with_relative_receiver_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("receivers.d")).unwrap();
        std::fs::write(
            dir.path().join("receivers.d/extra.yaml"),
            "aerospike:\n  - name: as-extra\n    endpoint: 10.0.0.2:3000\n",
        )
        .unwrap();
        let main = dir.path().join("config.yaml");
        std::fs::write(
            &main,
            "receiver_path: receivers.d\nreceivers:\n  aerospike:\n    - name: as-main\n",
        )
        .unwrap();

        let config = AppConfig::load_with_receiver_path(&main).unwrap();
        let names: Vec<_> = config.receivers.aerospike.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["as-main", "as-extra"]);
    }

    #[test]
    fn test_load_with_receiver_path_duplicates() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("more")).unwrap();
        std::fs::write(
            dir.path().join("more/dup.yaml"),
            "aerospike:\n  - name: as-main\n",
        )
        .unwrap();
        let main = dir.path().join("config.yaml");
        std::fs::write(
            &main,
            "receiver_path: more\nreceivers:\n  aerospike:\n    - name: as-main\n",
        )
        .unwrap();

        let err = AppConfig::load_with_receiver_path(&main).unwrap_err();
        assert!(err.to_string().contains("duplicate receiver name"));
    }
}
