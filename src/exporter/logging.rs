//! Logging exporter: summarizes each batch through `tracing`.
//!
//! Used by the binary when no file exporter is configured.

use crate::consumer::{Capabilities, ConsumerError, LogsConsumer, MetricsConsumer, TracesConsumer};
use crate::pdata::{Logs, Metrics, Traces};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExporter;

impl LoggingExporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MetricsConsumer for LoggingExporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn consume_metrics(&self, metrics: Metrics) -> Result<(), ConsumerError> {
        tracing::info!(
            resources = metrics.resource_metrics.len(),
            metrics = metrics.metric_count(),
            data_points = metrics.data_point_count(),
            "Metrics batch"
        );
        for rm in &metrics.resource_metrics {
            for metric in &rm.metrics {
                tracing::debug!(resource = ?rm.resource, metric = %metric.name, points = metric.data_points.len(), "Metric");
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TracesConsumer for LoggingExporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn consume_traces(&self, traces: Traces) -> Result<(), ConsumerError> {
        tracing::info!(
            resources = traces.resource_spans.len(),
            spans = traces.span_count(),
            "Traces batch"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl LogsConsumer for LoggingExporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn consume_logs(&self, logs: Logs) -> Result<(), ConsumerError> {
        tracing::info!(
            resources = logs.resource_logs.len(),
            records = logs.record_count(),
            "Logs batch"
        );
        Ok(())
    }
}
