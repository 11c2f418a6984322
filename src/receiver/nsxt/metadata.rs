//! NSX-T metric schema.

use strum_macros::IntoStaticStr;

use crate::pdata::{MetricDescriptor, MetricKind, ValueType};

/// Resource attribute: node display name.
pub const RESOURCE_NODE_NAME: &str = "nsxt.node.name";

/// Resource attribute: node id.
pub const RESOURCE_NODE_ID: &str = "nsxt.node.id";

/// Resource attribute: node class (`manager` or `transport`).
pub const RESOURCE_NODE_TYPE: &str = "nsxt.node.type";

/// Resource attribute: interface id.
pub const RESOURCE_DEVICE_ID: &str = "device.id";

pub static NODE_CPU_UTILIZATION: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.cpu.utilization",
    description: "The average amount of CPU being used by the node",
    unit: "%",
    kind: MetricKind::Gauge,
    value_type: ValueType::Double,
};

pub static NODE_FILESYSTEM_UTILIZATION: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.filesystem.utilization",
    description: "The percentage of storage space utilized",
    unit: "%",
    kind: MetricKind::Gauge,
    value_type: ValueType::Double,
};

pub static NODE_FILESYSTEM_USAGE: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.filesystem.usage",
    description: "The amount of storage space used by the node",
    unit: "By",
    kind: MetricKind::Sum { monotonic: false },
    value_type: ValueType::Int,
};

pub static NODE_MEMORY_USAGE: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.memory.usage",
    description: "The memory usage of the node",
    unit: "KBy",
    kind: MetricKind::Sum { monotonic: false },
    value_type: ValueType::Int,
};

pub static NODE_MEMORY_CACHE_USAGE: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.memory.cache.usage",
    description: "The size of the node's memory cache",
    unit: "KBy",
    kind: MetricKind::Sum { monotonic: false },
    value_type: ValueType::Int,
};

pub static NODE_NETWORK_IO: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.network.io",
    description: "The number of bytes which have flowed through the network interface",
    unit: "By",
    kind: MetricKind::Sum { monotonic: true },
    value_type: ValueType::Int,
};

pub static NODE_NETWORK_PACKET_COUNT: MetricDescriptor = MetricDescriptor {
    name: "nsxt.node.network.packet.count",
    description: "The number of packets which have flowed through the network interface on the node",
    unit: "{packets}",
    kind: MetricKind::Sum { monotonic: true },
    value_type: ValueType::Int,
};

/// Every metric this receiver can emit.
pub static ALL_METRICS: [&MetricDescriptor; 7] = [
    &NODE_CPU_UTILIZATION,
    &NODE_FILESYSTEM_UTILIZATION,
    &NODE_FILESYSTEM_USAGE,
    &NODE_MEMORY_USAGE,
    &NODE_MEMORY_CACHE_USAGE,
    &NODE_NETWORK_IO,
    &NODE_NETWORK_PACKET_COUNT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CpuClass {
    Datapath,
    Services,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DiskState {
    Used,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Received,
    Transmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PacketType {
    Dropped,
    Errored,
    Success,
}
