//! Aerospike metric schema: descriptors, attribute values and field tables.

use strum_macros::IntoStaticStr;

use crate::config::ConfigError;
use crate::pdata::{MetricDescriptor, MetricKind, ValueType};
use crate::scraper::{FieldRecorder, MetricTable};

/// Resource attribute: node name as reported by the `node` info command.
pub const RESOURCE_NODE_NAME: &str = "aerospike.node.name";

/// Resource attribute: namespace name.
pub const RESOURCE_NAMESPACE: &str = "aerospike.namespace";

// =============================================================================
// Descriptors
// =============================================================================

pub static NODE_CONNECTION_COUNT: MetricDescriptor = MetricDescriptor {
    name: "aerospike.node.connection.count",
    description: "Number of connections opened and closed to the node",
    unit: "{connections}",
    kind: MetricKind::Sum { monotonic: true },
    value_type: ValueType::Int,
};

pub static NODE_CONNECTION_OPEN: MetricDescriptor = MetricDescriptor {
    name: "aerospike.node.connection.open",
    description: "Current number of open connections to the node",
    unit: "{connections}",
    kind: MetricKind::Sum { monotonic: false },
    value_type: ValueType::Int,
};

pub static NODE_MEMORY_FREE: MetricDescriptor = MetricDescriptor {
    name: "aerospike.node.memory.free",
    description: "Percentage of the node's memory which is still free",
    unit: "%",
    kind: MetricKind::Gauge,
    value_type: ValueType::Int,
};

pub static NAMESPACE_DISK_AVAILABLE: MetricDescriptor = MetricDescriptor {
    name: "aerospike.namespace.disk.available",
    description: "Minimum percentage of contiguous disk space free to the namespace across all devices",
    unit: "%",
    kind: MetricKind::Gauge,
    value_type: ValueType::Int,
};

pub static NAMESPACE_MEMORY_FREE: MetricDescriptor = MetricDescriptor {
    name: "aerospike.namespace.memory.free",
    description: "Percentage of the namespace's memory which is still free",
    unit: "%",
    kind: MetricKind::Gauge,
    value_type: ValueType::Int,
};

pub static NAMESPACE_MEMORY_USAGE: MetricDescriptor = MetricDescriptor {
    name: "aerospike.namespace.memory.usage",
    description: "Memory currently used by each component of the namespace",
    unit: "By",
    kind: MetricKind::Sum { monotonic: false },
    value_type: ValueType::Int,
};

pub static NAMESPACE_SCAN_COUNT: MetricDescriptor = MetricDescriptor {
    name: "aerospike.namespace.scan.count",
    description: "Number of scan operations performed on the namespace",
    unit: "{scans}",
    kind: MetricKind::Sum { monotonic: true },
    value_type: ValueType::Int,
};

pub static NAMESPACE_TRANSACTION_COUNT: MetricDescriptor = MetricDescriptor {
    name: "aerospike.namespace.transaction.count",
    description: "Number of transactions performed on the namespace",
    unit: "{transactions}",
    kind: MetricKind::Sum { monotonic: true },
    value_type: ValueType::Int,
};

/// Every metric this receiver can emit.
pub static ALL_METRICS: [&MetricDescriptor; 8] = [
    &NODE_CONNECTION_COUNT,
    &NODE_CONNECTION_OPEN,
    &NODE_MEMORY_FREE,
    &NAMESPACE_DISK_AVAILABLE,
    &NAMESPACE_MEMORY_FREE,
    &NAMESPACE_MEMORY_USAGE,
    &NAMESPACE_SCAN_COUNT,
    &NAMESPACE_TRANSACTION_COUNT,
];

// =============================================================================
// Attributes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionType {
    Client,
    Fabric,
    Heartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionOp {
    Close,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum NamespaceComponent {
    Data,
    Index,
    Sindex,
    SetIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScanType {
    Aggregation,
    Basic,
    OpsBackground,
    UdfBackground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScanResult {
    Abort,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    Delete,
    Read,
    Udf,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionResult {
    Error,
    FilteredOut,
    NotFound,
    Success,
    Timeout,
}

// =============================================================================
// Field tables
// =============================================================================

fn open(kind: ConnectionType) -> FieldRecorder {
    FieldRecorder::new(&NODE_CONNECTION_OPEN).with_attribute("type", kind)
}

fn count(kind: ConnectionType, op: ConnectionOp) -> FieldRecorder {
    FieldRecorder::new(&NODE_CONNECTION_COUNT)
        .with_attribute("type", kind)
        .with_attribute("operation", op)
}

fn memory(component: NamespaceComponent) -> FieldRecorder {
    FieldRecorder::new(&NAMESPACE_MEMORY_USAGE).with_attribute("component", component)
}

fn scan(kind: ScanType, result: ScanResult) -> FieldRecorder {
    FieldRecorder::new(&NAMESPACE_SCAN_COUNT)
        .with_attribute("type", kind)
        .with_attribute("result", result)
}

fn transaction(kind: TransactionType, result: TransactionResult) -> FieldRecorder {
    FieldRecorder::new(&NAMESPACE_TRANSACTION_COUNT)
        .with_attribute("type", kind)
        .with_attribute("result", result)
}

/// Fields of the `statistics` info command.
pub fn node_table() -> Result<MetricTable, ConfigError> {
    use ConnectionOp::*;
    use ConnectionType::*;

    MetricTable::build([
        ("client_connections", open(Client)),
        ("fabric_connections", open(Fabric)),
        ("heartbeat_connections", open(Heartbeat)),
        ("client_connections_closed", count(Client, Close)),
        ("client_connections_opened", count(Client, Open)),
        ("fabric_connections_closed", count(Fabric, Close)),
        ("fabric_connections_opened", count(Fabric, Open)),
        ("heartbeat_connections_closed", count(Heartbeat, Close)),
        ("heartbeat_connections_opened", count(Heartbeat, Open)),
        ("system_free_mem_pct", FieldRecorder::new(&NODE_MEMORY_FREE)),
    ])
}

/// Fields of the `namespace/<name>` info command.
pub fn namespace_table() -> Result<MetricTable, ConfigError> {
    use NamespaceComponent::*;
    use ScanResult::{Abort, Complete};
    use ScanType::*;
    use TransactionResult::{FilteredOut, NotFound, Success, Timeout};
    use TransactionType::*;

    let mut entries = vec![
        (
            "device_available_pct",
            FieldRecorder::new(&NAMESPACE_DISK_AVAILABLE),
        ),
        ("memory_free_pct", FieldRecorder::new(&NAMESPACE_MEMORY_FREE)),
        ("memory_used_data_bytes", memory(Data)),
        ("memory_used_index_bytes", memory(Index)),
        ("memory_used_sindex_bytes", memory(Sindex)),
        ("memory_used_set_index_bytes", memory(SetIndex)),
        ("scan_aggr_abort", scan(Aggregation, Abort)),
        ("scan_aggr_complete", scan(Aggregation, Complete)),
        ("scan_aggr_error", scan(Aggregation, ScanResult::Error)),
        ("scan_basic_abort", scan(Basic, Abort)),
        ("scan_basic_complete", scan(Basic, Complete)),
        ("scan_basic_error", scan(Basic, ScanResult::Error)),
        ("scan_ops_bg_abort", scan(OpsBackground, Abort)),
        ("scan_ops_bg_complete", scan(OpsBackground, Complete)),
        ("scan_ops_bg_error", scan(OpsBackground, ScanResult::Error)),
        ("scan_udf_bg_abort", scan(UdfBackground, Abort)),
        ("scan_udf_bg_complete", scan(UdfBackground, Complete)),
        ("scan_udf_bg_error", scan(UdfBackground, ScanResult::Error)),
    ];

    entries.extend([
        ("client_delete_error", transaction(Delete, TransactionResult::Error)),
        ("client_delete_filtered_out", transaction(Delete, FilteredOut)),
        ("client_delete_not_found", transaction(Delete, NotFound)),
        ("client_delete_success", transaction(Delete, Success)),
        ("client_delete_timeout", transaction(Delete, Timeout)),
        ("client_read_error", transaction(Read, TransactionResult::Error)),
        ("client_read_filtered_out", transaction(Read, FilteredOut)),
        ("client_read_not_found", transaction(Read, NotFound)),
        ("client_read_success", transaction(Read, Success)),
        ("client_read_timeout", transaction(Read, Timeout)),
        ("client_udf_error", transaction(Udf, TransactionResult::Error)),
        ("client_udf_filtered_out", transaction(Udf, FilteredOut)),
        ("client_udf_not_found", transaction(Udf, NotFound)),
        ("client_udf_success", transaction(Udf, Success)),
        ("client_udf_timeout", transaction(Udf, Timeout)),
        ("client_write_error", transaction(Write, TransactionResult::Error)),
        ("client_write_filtered_out", transaction(Write, FilteredOut)),
        ("client_write_not_found", transaction(Write, NotFound)),
        ("client_write_success", transaction(Write, Success)),
        ("client_write_timeout", transaction(Write, Timeout)),
    ]);

    MetricTable::build(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_table() {
        let table = node_table().unwrap();
        assert_eq!(table.len(), 10);

        let closed = table.get("client_connections_closed").unwrap();
        assert_eq!(closed.metric, &NODE_CONNECTION_COUNT);
        assert_eq!(
            closed.attributes,
            vec![("type", "client"), ("operation", "close")]
        );
    }

    #[test]
    fn test_namespace_table() {
        let table = namespace_table().unwrap();
        assert_eq!(table.len(), 18 + 20);

        let ops = table.get("scan_ops_bg_error").unwrap();
        assert_eq!(
            ops.attributes,
            vec![("type", "ops_background"), ("result", "error")]
        );

        let filtered = table.get("client_delete_filtered_out").unwrap();
        assert_eq!(filtered.metric, &NAMESPACE_TRANSACTION_COUNT);
        assert_eq!(
            filtered.attributes,
            vec![("type", "delete"), ("result", "filtered_out")]
        );

        let set_index = table.get("memory_used_set_index_bytes").unwrap();
        assert_eq!(set_index.attributes, vec![("component", "set_index")]);
    }

    #[test]
    fn test_tables_cover_all_metrics() {
        let mut names: Vec<_> = node_table()
            .unwrap()
            .descriptors()
            .into_iter()
            .chain(namespace_table().unwrap().descriptors())
            .map(|d| d.name)
            .collect();
        names.sort_unstable();

        let mut all: Vec<_> = ALL_METRICS.iter().map(|d| d.name).collect();
        all.sort_unstable();
        assert_eq!(names, all);
    }
}
