//! Telemetry data model.
//!
//! Scrapers record into a [`MetricsBuilder`] and hand finished [`Metrics`]
//! batches to a consumer. [`Traces`] and [`Logs`] exist so exporters can accept
//! every signal the host pipeline fans in.
//!
//! All types serialize with serde; the file exporter writes them as one JSON
//! object per line.

mod builder;
mod logs;
mod metrics;
mod traces;

pub use builder::{MetricSetting, MetricsBuilder, MetricsSettings};
pub use logs::{LogRecord, Logs, ResourceLogs, SeverityText};
pub use metrics::{
    Attributes, DataPoint, Metric, MetricDescriptor, MetricKind, Metrics, NumberValue,
    ResourceMetrics, ValueType,
};
pub use traces::{ResourceSpans, Span, Traces};
