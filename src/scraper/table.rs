//! Static field-name to metric mapping.
//!
//! A [`MetricTable`] is built once per receiver and is the receiver's schema.
//! Lookups are exact-name only; fields not in the table are ignored so that
//! servers may add or drop statistics freely.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::ConfigError;
use crate::pdata::{MetricDescriptor, MetricsBuilder};

use super::errors::{ScrapeError, ScrapeErrors};
use super::parse::{StatMap, try_convert};

/// How one raw field is recorded: target metric plus fixed attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecorder {
    pub metric: &'static MetricDescriptor,
    pub attributes: Vec<(&'static str, &'static str)>,
}

impl FieldRecorder {
    pub fn new(metric: &'static MetricDescriptor) -> Self {
        Self {
            metric,
            attributes: Vec::new(),
        }
    }

    /// Attach a fixed attribute to every point recorded from this field.
    pub fn with_attribute(mut self, key: &'static str, value: impl Into<&'static str>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }
}

/// Immutable field-name lookup table.
#[derive(Debug, Clone)]
pub struct MetricTable {
    fields: HashMap<&'static str, FieldRecorder>,
}

impl MetricTable {
    /// Build the table, rejecting duplicate field names.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` naming the first duplicate field.
    pub fn build<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'static str, FieldRecorder)>,
    {
        let mut fields = HashMap::new();
        for (field, recorder) in entries {
            if fields.insert(field, recorder).is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate metric table field: '{field}'"
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn get(&self, field: &str) -> Option<&FieldRecorder> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Distinct metrics referenced by the table.
    #[cfg(test)]
    pub(crate) fn descriptors(&self) -> Vec<&'static MetricDescriptor> {
        let mut out: Vec<&'static MetricDescriptor> = Vec::new();
        for recorder in self.fields.values() {
            if !out.iter().any(|d| d.name == recorder.metric.name) {
                out.push(recorder.metric);
            }
        }
        out.sort_by_key(|d| d.name);
        out
    }

    /// Record every known field of `stats` into `mb`.
    ///
    /// Conversion failures are added to `errs` and the remaining fields are
    /// still recorded. Returns the number of points recorded.
    pub fn record(
        &self,
        mb: &mut MetricsBuilder,
        ts: DateTime<Utc>,
        stats: &StatMap,
        errs: &ScrapeErrors,
    ) -> usize {
        let mut recorded = 0;
        for (field, raw) in stats {
            let Some(recorder) = self.fields.get(field.as_str()) else {
                continue;
            };
            match try_convert(raw, recorder.metric.value_type) {
                Ok(value) => {
                    if mb.record(recorder.metric, ts, value, &recorder.attributes) {
                        recorded += 1;
                    }
                }
                Err(source) => errs.add_partial(
                    1,
                    ScrapeError::Conversion {
                        field: field.clone(),
                        value: raw.clone(),
                        source,
                    },
                ),
            }
        }
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdata::{MetricKind, MetricsSettings, NumberValue, ValueType};

    static OPEN: MetricDescriptor = MetricDescriptor {
        name: "test.connection.open",
        description: "Open connections",
        unit: "{connections}",
        kind: MetricKind::Sum { monotonic: false },
        value_type: ValueType::Int,
    };

    fn table() -> MetricTable {
        MetricTable::build([
            (
                "client_connections",
                FieldRecorder::new(&OPEN).with_attribute("type", "client"),
            ),
            (
                "fabric_connections",
                FieldRecorder::new(&OPEN).with_attribute("type", "fabric"),
            ),
        ])
        .unwrap()
    }

    fn stats(pairs: &[(&str, &str)]) -> StatMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let result = MetricTable::build([
            ("client_connections", FieldRecorder::new(&OPEN)),
            ("client_connections", FieldRecorder::new(&OPEN)),
        ]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("duplicate metric table field"));
    }

    #[test]
    fn test_record_known_fields() {
        let table = table();
        let mut mb = MetricsBuilder::new(MetricsSettings::new());
        let errs = ScrapeErrors::new();

        let n = table.record(
            &mut mb,
            Utc::now(),
            &stats(&[("client_connections", "10"), ("fabric_connections", "2")]),
            &errs,
        );
        assert_eq!(n, 2);
        assert!(errs.is_empty());

        let metrics = mb.emit();
        let mut values: Vec<_> = metrics
            .data_points("test.connection.open")
            .map(|(_, dp)| (dp.attributes["type"].clone(), dp.value))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            values,
            vec![
                ("client".to_string(), NumberValue::Int(10)),
                ("fabric".to_string(), NumberValue::Int(2)),
            ]
        );
    }

    #[test]
    fn test_record_ignores_unknown_fields() {
        let table = table();
        let mut mb = MetricsBuilder::new(MetricsSettings::new());
        let errs = ScrapeErrors::new();

        let n = table.record(
            &mut mb,
            Utc::now(),
            &stats(&[("uptime", "not-a-number"), ("client_connections_x", "1")]),
            &errs,
        );
        assert_eq!(n, 0);
        assert!(errs.is_empty());
    }

    #[test]
    fn test_record_conversion_error_continues() {
        let table = table();
        let mut mb = MetricsBuilder::new(MetricsSettings::new());
        let errs = ScrapeErrors::new();

        let n = table.record(
            &mut mb,
            Utc::now(),
            &stats(&[("client_connections", "ten"), ("fabric_connections", "2")]),
            &errs,
        );
        assert_eq!(n, 1);
        let combined = errs.combine().unwrap();
        assert_eq!(combined.failed, 1);
        assert!(combined.message.contains("client_connections"));
    }

    #[test]
    fn test_descriptors_distinct() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.descriptors(), vec![&OPEN]);
    }
}
