//! Trace batch types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::Attributes;

/// A finished span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Hex-encoded 16-byte trace identifier.
    pub trace_id: String,
    /// Hex-encoded 8-byte span identifier.
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Spans attributed to one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpans {
    pub resource: Attributes,
    pub spans: Vec<Span>,
}

/// A trace batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Traces {
    pub resource_spans: Vec<ResourceSpans>,
}

impl Traces {
    /// Number of spans across all resources.
    pub fn span_count(&self) -> usize {
        self.resource_spans.iter().map(|rs| rs.spans.len()).sum()
    }
}
