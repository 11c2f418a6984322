//! Metric batch types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Attribute set attached to a resource or a data point.
pub type Attributes = BTreeMap<String, String>;

/// Numeric representation of a metric's data points.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Double,
}

/// Aggregation shape of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricKind {
    /// Point-in-time value.
    Gauge,
    /// Cumulative sum.
    Sum {
        /// Whether the sum only ever grows.
        monotonic: bool,
    },
}

/// Static description of one metric in a receiver's schema.
///
/// Descriptors are `'static` tables; the [`MetricKind`] and [`ValueType`]
/// pair decides how raw values are converted and how points are emitted.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Fully qualified metric name (e.g. `aerospike.node.connection.open`).
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// UCUM unit.
    pub unit: &'static str,
    /// Aggregation shape.
    pub kind: MetricKind,
    /// Value representation.
    pub value_type: ValueType,
}

/// A single numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Double(f64),
}

impl NumberValue {
    /// Value as `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Double(v) => v,
        }
    }

    /// Integer value, if this is an integer point.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Double(_) => None,
        }
    }

    /// Coerce into the representation required by `value_type`.
    pub fn coerce(self, value_type: ValueType) -> Self {
        match (self, value_type) {
            (Self::Int(v), ValueType::Double) => Self::Double(v as f64),
            (Self::Double(v), ValueType::Int) => Self::Int(v as i64),
            (v, _) => v,
        }
    }
}

/// One recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Start of the collection window (receiver start time).
    pub start_time: DateTime<Utc>,
    /// Observation time.
    pub time: DateTime<Utc>,
    /// Observed value.
    pub value: NumberValue,
    /// Point attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

/// A metric with its data points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: MetricKind,
    pub data_points: Vec<DataPoint>,
}

impl Metric {
    /// Create an empty metric from its descriptor.
    pub fn from_descriptor(descriptor: &MetricDescriptor) -> Self {
        Self {
            name: descriptor.name.to_owned(),
            description: descriptor.description.to_owned(),
            unit: descriptor.unit.to_owned(),
            kind: descriptor.kind,
            data_points: Vec::new(),
        }
    }
}

/// Metrics attributed to one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    /// Resource identity attributes.
    pub resource: Attributes,
    /// Metrics recorded for this resource.
    pub metrics: Vec<Metric>,
}

/// A finished metrics batch, the output of one scrape cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl Metrics {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no resource carries any metric.
    pub fn is_empty(&self) -> bool {
        self.data_point_count() == 0
    }

    /// Number of metrics across all resources.
    pub fn metric_count(&self) -> usize {
        self.resource_metrics.iter().map(|rm| rm.metrics.len()).sum()
    }

    /// Number of data points across all metrics.
    pub fn data_point_count(&self) -> usize {
        self.resource_metrics
            .iter()
            .flat_map(|rm| rm.metrics.iter())
            .map(|m| m.data_points.len())
            .sum()
    }

    /// Iterate over every data point of the named metric with its resource.
    pub fn data_points<'a>(
        &'a self,
        metric_name: &'a str,
    ) -> impl Iterator<Item = (&'a Attributes, &'a DataPoint)> + 'a {
        self.resource_metrics.iter().flat_map(move |rm| {
            rm.metrics
                .iter()
                .filter(move |m| m.name == metric_name)
                .flat_map(move |m| m.data_points.iter().map(move |dp| (&rm.resource, dp)))
        })
    }

    /// Append all resources of `other`.
    pub fn extend(&mut self, other: Metrics) {
        self.resource_metrics.extend(other.resource_metrics);
    }
}
