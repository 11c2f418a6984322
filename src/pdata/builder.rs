//! Schema-agnostic metrics builder.
//!
//! A receiver records points against `'static` [`MetricDescriptor`]s, commits
//! them to a resource with [`MetricsBuilder::emit_for_resource`], and finally
//! collects the batch with [`MetricsBuilder::emit`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{
    Attributes, DataPoint, Metric, MetricDescriptor, Metrics, NumberValue, ResourceMetrics,
};

/// Per-metric toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSetting {
    /// Whether points for this metric are recorded.
    pub enabled: bool,
}

impl Default for MetricSetting {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Metric toggles keyed by metric name. Metrics not listed are enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSettings(BTreeMap<String, MetricSetting>);

impl MetricsSettings {
    /// Create settings with every metric enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a single metric.
    pub fn with_enabled(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(name.into(), MetricSetting { enabled });
        self
    }

    /// Whether the named metric should be recorded.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).map(|s| s.enabled).unwrap_or(true)
    }

    /// Reject toggles naming metrics outside `known`.
    pub fn validate(&self, known: &[&MetricDescriptor]) -> Result<(), String> {
        for name in self.0.keys() {
            if !known.iter().any(|d| d.name == name) {
                return Err(format!("unknown metric '{name}' in metrics settings"));
            }
        }
        Ok(())
    }
}

/// Accumulates data points and attributes them to resources.
///
/// Recording is sequential: all points for one resource are recorded, then
/// [`emit_for_resource`](Self::emit_for_resource) is called exactly once for
/// that resource before the next resource's points are recorded.
#[derive(Debug)]
pub struct MetricsBuilder {
    settings: MetricsSettings,
    start_time: DateTime<Utc>,
    pending: Vec<Metric>,
    emitted: Vec<ResourceMetrics>,
}

impl MetricsBuilder {
    /// Create a builder with the given toggles.
    pub fn new(settings: MetricsSettings) -> Self {
        Self {
            settings,
            start_time: Utc::now(),
            pending: Vec::new(),
            emitted: Vec::new(),
        }
    }

    /// Settings this builder was created with.
    pub fn settings(&self) -> &MetricsSettings {
        &self.settings
    }

    /// Record one data point.
    ///
    /// Returns `false` when the metric is disabled and the point was dropped.
    pub fn record(
        &mut self,
        descriptor: &'static MetricDescriptor,
        ts: DateTime<Utc>,
        value: NumberValue,
        attributes: &[(&str, &str)],
    ) -> bool {
        if !self.settings.is_enabled(descriptor.name) {
            return false;
        }

        let point = DataPoint {
            start_time: self.start_time,
            time: ts,
            value: value.coerce(descriptor.value_type),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        };

        match self.pending.iter_mut().find(|m| m.name == descriptor.name) {
            Some(metric) => metric.data_points.push(point),
            None => {
                let mut metric = Metric::from_descriptor(descriptor);
                metric.data_points.push(point);
                self.pending.push(metric);
            }
        }
        true
    }

    /// Number of points recorded since the last resource commit.
    pub fn pending_points(&self) -> usize {
        self.pending.iter().map(|m| m.data_points.len()).sum()
    }

    /// Commit pending points under the given resource identity.
    ///
    /// Resources with no recorded points are not emitted.
    pub fn emit_for_resource<I, K, V>(&mut self, resource: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.pending.is_empty() {
            return;
        }
        let resource: Attributes = resource
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let metrics = std::mem::take(&mut self.pending);
        self.emitted.push(ResourceMetrics { resource, metrics });
    }

    /// Finalize the batch and reset the builder.
    ///
    /// Points still pending are committed under an empty resource.
    pub fn emit(&mut self) -> Metrics {
        self.emit_for_resource(std::iter::empty::<(String, String)>());
        Metrics {
            resource_metrics: std::mem::take(&mut self.emitted),
        }
    }
}
