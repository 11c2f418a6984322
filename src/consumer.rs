//! Consumer interfaces that accept finished telemetry batches.
//!
//! Receivers push [`Metrics`] into a [`MetricsConsumer`]; exporters implement
//! one or more of the consumer traits.

use thiserror::Error;

use crate::pdata::{Logs, Metrics, Traces};

/// Errors raised while consuming a batch.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Writing the batch failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the batch failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a consumer does with the data it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Whether the consumer modifies batches in place.
    pub mutates_data: bool,
}

/// Accepts metric batches.
#[async_trait::async_trait]
pub trait MetricsConsumer: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn consume_metrics(&self, metrics: Metrics) -> Result<(), ConsumerError>;
}

/// Accepts trace batches.
#[async_trait::async_trait]
pub trait TracesConsumer: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn consume_traces(&self, traces: Traces) -> Result<(), ConsumerError>;
}

/// Accepts log batches.
#[async_trait::async_trait]
pub trait LogsConsumer: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn consume_logs(&self, logs: Logs) -> Result<(), ConsumerError>;
}
