//! File exporter: one JSON object per batch, one batch per line.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::consumer::{Capabilities, ConsumerError, LogsConsumer, MetricsConsumer, TracesConsumer};
use crate::pdata::{Logs, Metrics, Traces};

use super::rotation::{RotatingFile, RotationConfig};

/// File exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExporterConfig {
    /// Output file path.
    pub path: PathBuf,
    /// Rotation settings.
    #[serde(default)]
    pub rotation: RotationConfig,
}

impl FileExporterConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rotation: RotationConfig::default(),
        }
    }

    pub fn with_rotation(mut self, rotation: RotationConfig) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "file exporter: path must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Encodes batches as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshaler;

impl JsonMarshaler {
    pub fn marshal_metrics(&self, metrics: &Metrics) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(metrics)
    }

    pub fn marshal_traces(&self, traces: &Traces) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(traces)
    }

    pub fn marshal_logs(&self, logs: &Logs) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(logs)
    }
}

/// Writes every batch it consumes as one line of a rotating file.
#[derive(Debug)]
pub struct FileExporter {
    marshaler: JsonMarshaler,
    file: Mutex<RotatingFile>,
}

impl FileExporter {
    pub fn new(config: &FileExporterConfig) -> Self {
        Self::with_file(RotatingFile::new(&config.path, &config.rotation))
    }

    /// Create an exporter around an already configured file.
    pub fn with_file(file: RotatingFile) -> Self {
        Self {
            marshaler: JsonMarshaler,
            file: Mutex::new(file),
        }
    }

    /// Path of the active output file.
    pub fn path(&self) -> PathBuf {
        self.file.lock().path().to_path_buf()
    }

    /// Close the output file. Later writes reopen it.
    pub fn shutdown(&self) -> Result<(), ConsumerError> {
        self.file.lock().close()?;
        Ok(())
    }

    fn export_line(&self, mut buf: Vec<u8>) -> Result<(), ConsumerError> {
        buf.push(b'\n');
        self.file.lock().write_all(&buf)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetricsConsumer for FileExporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities { mutates_data: false }
    }

    async fn consume_metrics(&self, metrics: Metrics) -> Result<(), ConsumerError> {
        let buf = self.marshaler.marshal_metrics(&metrics)?;
        self.export_line(buf)
    }
}

#[async_trait::async_trait]
impl TracesConsumer for FileExporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities { mutates_data: false }
    }

    async fn consume_traces(&self, traces: Traces) -> Result<(), ConsumerError> {
        let buf = self.marshaler.marshal_traces(&traces)?;
        self.export_line(buf)
    }
}

#[async_trait::async_trait]
impl LogsConsumer for FileExporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities { mutates_data: false }
    }

    async fn consume_logs(&self, logs: Logs) -> Result<(), ConsumerError> {
        let buf = self.marshaler.marshal_logs(&logs)?;
        self.export_line(buf)
    }
}
