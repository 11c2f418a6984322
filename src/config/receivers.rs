//! Receiver configuration lists.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::receiver::aerospike::AerospikeConfig;
use crate::receiver::nsxt::NsxtConfig;

use super::validation::ConfigError;

/// Receivers grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiversConfig {
    /// Aerospike receivers.
    #[serde(default)]
    pub aerospike: Vec<AerospikeConfig>,

    /// NSX-T receivers.
    #[serde(default)]
    pub nsxt: Vec<NsxtConfig>,
}

impl ReceiversConfig {
    /// Append every receiver of `other`.
    #[must_use]
    pub fn merge(mut self, other: ReceiversConfig) -> Self {
        self.aerospike.extend(other.aerospike);
        self.nsxt.extend(other.nsxt);
        self
    }

    /// Total number of configured receivers, enabled or not.
    pub fn len(&self) -> usize {
        self.aerospike.len() + self.nsxt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate every receiver. Names must be non-empty and unique across kinds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let names = self
            .aerospike
            .iter()
            .map(|r| ("aerospike", r.name.as_str()))
            .chain(self.nsxt.iter().map(|r| ("nsxt", r.name.as_str())));

        for (kind, name) in names {
            if name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{kind} receiver name cannot be empty"
                )));
            }
            if !seen.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate receiver name: '{name}'"
                )));
            }
        }

        for receiver in &self.aerospike {
            receiver.validate()?;
        }
        for receiver in &self.nsxt {
            receiver.validate()?;
        }
        Ok(())
    }

    /// Load and merge receiver lists from every YAML file in `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "receiver_path '{}' is not a directory",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml" | "yml")
            );
            if path.is_file() && is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        let mut merged = Self::default();
        for path in paths {
            tracing::debug!(path = %path.display(), "Loading receiver config");
            let content = std::fs::read_to_string(&path)?;
            let file: Self = serde_yaml::from_str(&content).map_err(|e| {
                ConfigError::ValidationError(format!("failed to parse '{}': {}", path.display(), e))
            })?;
            merged = merged.merge(file);
        }
        Ok(merged)
    }
}
