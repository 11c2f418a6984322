//! NSX-T manager API response models.
//!
//! Only the fields the receiver reads are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Which API tree a node lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum NodeClass {
    /// Manager (cluster) node: `/api/v1/cluster/nodes`.
    Manager,
    /// Transport node: `/api/v1/transport-nodes`.
    Transport,
}

impl NodeClass {
    /// API path prefix for nodes of this class.
    pub fn path(self) -> &'static str {
        match self {
            Self::Manager => "/api/v1/cluster/nodes",
            Self::Transport => "/api/v1/transport-nodes",
        }
    }
}

/// `GET /api/v1/cluster/nodes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterNodeList {
    #[serde(default)]
    pub results: Vec<ClusterNode>,
}

/// Opaque role marker; only its presence matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRole {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub manager_role: Option<NodeRole>,
    #[serde(default)]
    pub controller_role: Option<NodeRole>,
}

/// `GET /api/v1/transport-nodes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportNodeList {
    #[serde(default)]
    pub results: Vec<TransportNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportNode {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub resource_type: Option<String>,
}

/// `GET /api/v1/transport-nodes/{id}/status` wraps the node status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportNodeStatus {
    #[serde(default)]
    pub node_status: NodeStatus,
}

/// `GET /api/v1/cluster/nodes/{id}/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub system_status: Option<NodeSystemStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSystemStatus {
    #[serde(default)]
    pub cpu_usage: NodeSystemCpuUsage,
    /// Kilobytes.
    #[serde(default)]
    pub mem_used: i64,
    /// Kilobytes.
    #[serde(default)]
    pub mem_cache: i64,
    /// Kilobytes.
    #[serde(default)]
    pub mem_total: i64,
    /// Bytes.
    #[serde(default)]
    pub disk_space_used: i64,
    /// Bytes.
    #[serde(default)]
    pub disk_space_total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSystemCpuUsage {
    #[serde(default)]
    pub avg_cpu_core_usage_dpdk: f64,
    #[serde(default)]
    pub avg_cpu_core_usage_non_dpdk: f64,
    #[serde(default)]
    pub highest_cpu_core_usage_dpdk: f64,
    #[serde(default)]
    pub highest_cpu_core_usage_non_dpdk: f64,
}

/// `GET .../{id}/network/interfaces`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterfaceList {
    #[serde(default)]
    pub results: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub interface_id: String,
}

/// `GET .../{id}/network/interfaces/{interface}/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterfaceStats {
    #[serde(default)]
    pub interface_id: String,
    #[serde(default)]
    pub rx_bytes: i64,
    #[serde(default)]
    pub rx_packets: i64,
    #[serde(default)]
    pub rx_dropped: i64,
    #[serde(default)]
    pub rx_errors: i64,
    #[serde(default)]
    pub tx_bytes: i64,
    #[serde(default)]
    pub tx_packets: i64,
    #[serde(default)]
    pub tx_dropped: i64,
    #[serde(default)]
    pub tx_errors: i64,
}
