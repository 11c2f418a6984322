//! NSX-T scraper: node system status and interface counters per cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::pdata::{MetricsBuilder, NumberValue};
use crate::scraper::{ScrapeError, ScrapeErrors, ScrapeOutput, Schedule, Scraper};

use super::client::NsxtClient;
use super::config::NsxtConfig;
use super::metadata::{
    CpuClass, Direction, DiskState, NODE_CPU_UTILIZATION, NODE_FILESYSTEM_USAGE,
    NODE_FILESYSTEM_UTILIZATION, NODE_MEMORY_CACHE_USAGE, NODE_MEMORY_USAGE, NODE_NETWORK_IO,
    NODE_NETWORK_PACKET_COUNT, PacketType, RESOURCE_DEVICE_ID, RESOURCE_NODE_ID,
    RESOURCE_NODE_NAME, RESOURCE_NODE_TYPE,
};
use super::model::{NetworkInterfaceStats, NodeClass, NodeSystemStatus};

/// A node selected for scraping this cycle.
#[derive(Debug, Clone)]
struct NodeTarget {
    id: String,
    name: String,
    class: NodeClass,
}

/// Everything fetched for one node.
#[derive(Debug)]
struct NodeSnapshot {
    target: NodeTarget,
    system: Option<NodeSystemStatus>,
    interfaces: Vec<NetworkInterfaceStats>,
}

/// Scrapes every transport node and manager node of one NSX-T manager.
pub struct NsxtScraper {
    config: NsxtConfig,
    schedule: Schedule,
    client: RwLock<Option<Arc<dyn NsxtClient>>>,
    mb: Mutex<MetricsBuilder>,
}

impl NsxtScraper {
    /// Create a scraper from a validated configuration.
    ///
    /// # Errors
    /// Returns `ScrapeError::Config` if the configuration is invalid.
    pub fn new(config: NsxtConfig) -> Result<Self, ScrapeError> {
        config.validate()?;
        let schedule = config.schedule()?;
        Ok(Self {
            schedule,
            client: RwLock::new(None),
            mb: Mutex::new(MetricsBuilder::new(config.metrics.clone())),
            config,
        })
    }

    /// Create a scraper that uses `client` instead of building one on start.
    pub fn with_client(config: NsxtConfig, client: Arc<dyn NsxtClient>) -> Result<Self, ScrapeError> {
        let scraper = Self::new(config)?;
        *scraper.client.write() = Some(client);
        Ok(scraper)
    }

    fn client(&self) -> Result<Arc<dyn NsxtClient>, ScrapeError> {
        self.client.read().clone().ok_or(ScrapeError::NotStarted)
    }

    /// List the nodes to scrape: every transport node, then manager-role cluster nodes.
    async fn targets(&self, client: &dyn NsxtClient) -> Result<Vec<NodeTarget>, ScrapeError> {
        let transport = client
            .transport_nodes()
            .await
            .map_err(|e| ScrapeError::query("transport nodes", e))?;
        let cluster = client
            .cluster_nodes()
            .await
            .map_err(|e| ScrapeError::query("cluster nodes", e))?;

        let mut targets: Vec<NodeTarget> = transport
            .into_iter()
            .map(|n| NodeTarget {
                id: n.id,
                name: n.display_name,
                class: NodeClass::Transport,
            })
            .collect();
        targets.extend(
            cluster
                .into_iter()
                .filter(|n| n.manager_role.is_some())
                .map(|n| NodeTarget {
                    id: n.id,
                    name: n.display_name,
                    class: NodeClass::Manager,
                }),
        );
        Ok(targets)
    }

    fn record_node(
        &self,
        mb: &mut MetricsBuilder,
        now: DateTime<Utc>,
        target: &NodeTarget,
        system: Option<&NodeSystemStatus>,
    ) {
        let Some(ss) = system else {
            tracing::debug!(receiver = %self.config.name, node = %target.name, "Node reported no system status");
            return;
        };

        let cpu = &ss.cpu_usage;
        for (class, value) in [
            (CpuClass::Datapath, cpu.avg_cpu_core_usage_dpdk),
            (CpuClass::Services, cpu.avg_cpu_core_usage_non_dpdk),
        ] {
            mb.record(
                &NODE_CPU_UTILIZATION,
                now,
                NumberValue::Double(value),
                &[("class", class.into())],
            );
        }

        if ss.disk_space_total > 0 {
            let utilization = ss.disk_space_used as f64 / ss.disk_space_total as f64 * 100.0;
            mb.record(&NODE_FILESYSTEM_UTILIZATION, now, NumberValue::Double(utilization), &[]);
        }
        for (state, value) in [
            (DiskState::Used, ss.disk_space_used),
            (DiskState::Available, ss.disk_space_total.wrapping_sub(ss.disk_space_used)),
        ] {
            mb.record(
                &NODE_FILESYSTEM_USAGE,
                now,
                NumberValue::Int(value),
                &[("state", state.into())],
            );
        }

        mb.record(&NODE_MEMORY_USAGE, now, NumberValue::Int(ss.mem_used), &[]);
        mb.record(&NODE_MEMORY_CACHE_USAGE, now, NumberValue::Int(ss.mem_cache), &[]);

        mb.emit_for_resource([
            (RESOURCE_NODE_NAME, target.name.as_str()),
            (RESOURCE_NODE_ID, target.id.as_str()),
            (RESOURCE_NODE_TYPE, target.class.as_ref()),
        ]);
    }

    fn record_interface(
        mb: &mut MetricsBuilder,
        now: DateTime<Utc>,
        target: &NodeTarget,
        stats: &NetworkInterfaceStats,
    ) {
        let directions = [
            (Direction::Received, stats.rx_bytes, stats.rx_packets, stats.rx_dropped, stats.rx_errors),
            (Direction::Transmitted, stats.tx_bytes, stats.tx_packets, stats.tx_dropped, stats.tx_errors),
        ];
        for (direction, bytes, packets, dropped, errors) in directions {
            let direction: &str = direction.into();
            mb.record(
                &NODE_NETWORK_IO,
                now,
                NumberValue::Int(bytes),
                &[("direction", direction)],
            );
            // raw API counters may be inconsistent; subtraction wraps
            let success = packets.wrapping_sub(dropped).wrapping_sub(errors);
            for (kind, value) in [
                (PacketType::Dropped, dropped),
                (PacketType::Errored, errors),
                (PacketType::Success, success),
            ] {
                mb.record(
                    &NODE_NETWORK_PACKET_COUNT,
                    now,
                    NumberValue::Int(value),
                    &[("direction", direction), ("type", kind.into())],
                );
            }
        }

        mb.emit_for_resource([
            (RESOURCE_DEVICE_ID, stats.interface_id.as_str()),
            (RESOURCE_NODE_NAME, target.name.as_str()),
            (RESOURCE_NODE_ID, target.id.as_str()),
            (RESOURCE_NODE_TYPE, target.class.as_ref()),
        ]);
    }
}

/// Fetch the status and interface counters of one node.
async fn collect_node(
    client: Arc<dyn NsxtClient>,
    target: NodeTarget,
    errs: Arc<ScrapeErrors>,
) -> NodeSnapshot {
    let (status, interfaces) = tokio::join!(
        client.node_status(&target.id, target.class),
        client.interfaces(&target.id, target.class),
    );

    let system = match status {
        Ok(status) => status.system_status,
        Err(e) => {
            errs.add_partial(1, ScrapeError::query(format!("status of node {}", target.id), e));
            None
        }
    };

    let mut stats = Vec::new();
    match interfaces {
        Ok(interfaces) => {
            for iface in interfaces {
                match client
                    .interface_status(&target.id, &iface.interface_id, target.class)
                    .await
                {
                    Ok(mut s) => {
                        s.interface_id = iface.interface_id;
                        stats.push(s);
                    }
                    Err(e) => errs.add_partial(
                        1,
                        ScrapeError::query(
                            format!("stats of interface {} on node {}", iface.interface_id, target.id),
                            e,
                        ),
                    ),
                }
            }
        }
        Err(e) => errs.add_partial(1, ScrapeError::query(format!("interfaces of node {}", target.id), e)),
    }

    NodeSnapshot {
        target,
        system,
        interfaces: stats,
    }
}

impl std::fmt::Debug for NsxtScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NsxtScraper")
            .field("name", &self.config.name)
            .field("endpoint", &self.config.endpoint)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Scraper for NsxtScraper {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &'static str {
        "nsxt"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    async fn start(&self) -> Result<(), ScrapeError> {
        if self.client.read().is_some() {
            return Ok(());
        }
        tracing::debug!(receiver = %self.config.name, endpoint = %self.config.endpoint, "Starting nsxt receiver");
        let client = self
            .config
            .http_client()
            .map_err(|e| ScrapeError::Connection(format!("failed to start: {e}")))?;
        *self.client.write() = Some(Arc::new(client));
        Ok(())
    }

    async fn scrape(&self) -> Result<ScrapeOutput, ScrapeError> {
        let client = self.client()?;
        let mut mb = self.mb.lock().await;
        let now = Utc::now();

        let targets = self.targets(client.as_ref()).await?;
        tracing::debug!(receiver = %self.config.name, nodes = targets.len(), "Scraping nodes");

        let errs = Arc::new(ScrapeErrors::new());
        let mut tasks = JoinSet::new();
        for (idx, target) in targets.into_iter().enumerate() {
            let client = Arc::clone(&client);
            let errs = Arc::clone(&errs);
            tasks.spawn(async move { (idx, collect_node(client, target, errs).await) });
        }

        let mut snapshots = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => errs.add_partial(1, ScrapeError::query("node task", e)),
            }
        }
        snapshots.sort_by_key(|(idx, _)| *idx);

        for (_, snapshot) in &snapshots {
            self.record_node(&mut mb, now, &snapshot.target, snapshot.system.as_ref());
            for stats in &snapshot.interfaces {
                Self::record_interface(&mut mb, now, &snapshot.target, stats);
            }
        }

        let errs = Arc::try_unwrap(errs).unwrap_or_else(|shared| shared.take());
        Ok(ScrapeOutput::new(mb.emit(), errs))
    }

    async fn shutdown(&self) -> Result<(), ScrapeError> {
        self.client.write().take();
        tracing::debug!(receiver = %self.config.name, "NSX-T receiver stopped");
        Ok(())
    }
}
