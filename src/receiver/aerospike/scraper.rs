//! Aerospike scraper: node and namespace statistics per cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::pdata::MetricsBuilder;
use crate::scraper::parse::{FIELD_DELIMITER, parse_list, parse_stats};
use crate::scraper::{MetricTable, ScrapeError, ScrapeErrors, ScrapeOutput, Schedule, Scraper};

use super::client::{Client, ClientPolicy, Endpoint};
use super::config::AerospikeConfig;
use super::metadata::{RESOURCE_NAMESPACE, RESOURCE_NODE_NAME, namespace_table, node_table};
use super::protocol::RawResponse;

/// Info commands issued to every node each cycle.
pub const NODE_INFO_COMMANDS: [&str; 4] = ["namespaces", "node", "statistics", "services"];

/// Scrapes one seed node and, optionally, every peer it advertises.
pub struct AerospikeScraper {
    config: AerospikeConfig,
    schedule: Schedule,
    seed: Endpoint,
    policy: ClientPolicy,
    node_table: MetricTable,
    namespace_table: MetricTable,
    client: RwLock<Option<Arc<Client>>>,
    peers: Mutex<HashMap<Endpoint, Client>>,
    mb: Mutex<MetricsBuilder>,
}

impl AerospikeScraper {
    /// Create a scraper from a validated configuration.
    ///
    /// # Errors
    /// Returns `ScrapeError::Config` if the configuration is invalid.
    pub fn new(config: AerospikeConfig) -> Result<Self, ScrapeError> {
        config.validate()?;
        let schedule = config.schedule()?;
        let seed = config.seed()?;
        let policy = config.client_policy();

        Ok(Self {
            schedule,
            seed,
            policy,
            node_table: node_table()?,
            namespace_table: namespace_table()?,
            client: RwLock::new(None),
            peers: Mutex::new(HashMap::new()),
            mb: Mutex::new(MetricsBuilder::new(config.metrics.clone())),
            config,
        })
    }

    fn seed_client(&self) -> Result<Arc<Client>, ScrapeError> {
        self.client.read().clone().ok_or(ScrapeError::NotStarted)
    }

    /// Record node statistics, then each namespace of that node.
    async fn scrape_node(
        &self,
        client: &Client,
        info: &RawResponse,
        now: DateTime<Utc>,
        mb: &mut MetricsBuilder,
        errs: &ScrapeErrors,
    ) {
        let node = info.get("node").map(String::as_str).unwrap_or_default();
        if let Some(blob) = info.get("statistics") {
            let stats = parse_stats(blob, FIELD_DELIMITER);
            self.node_table.record(mb, now, &stats, errs);
        }
        mb.emit_for_resource([(RESOURCE_NODE_NAME, node)]);

        let namespaces = parse_list(info.get("namespaces").map(String::as_str).unwrap_or_default());
        tracing::debug!(receiver = %self.config.name, node = %node, namespaces = namespaces.len(), "Scraping namespaces");

        for namespace in namespaces {
            let command = format!("namespace/{namespace}");
            match client.info(&[command.as_str()]).await {
                Ok(resp) => {
                    let blob = resp.get(&command).map(String::as_str).unwrap_or_default();
                    let stats = parse_stats(blob, FIELD_DELIMITER);
                    self.namespace_table.record(mb, now, &stats, errs);
                    mb.emit_for_resource([
                        (RESOURCE_NAMESPACE, namespace.as_str()),
                        (RESOURCE_NODE_NAME, node),
                    ]);
                }
                Err(e) => errs.add_partial(1, ScrapeError::query(command, e)),
            }
        }
    }

    /// Scrape every advertised peer through a cached per-peer client.
    async fn scrape_peers(
        &self,
        services: &str,
        now: DateTime<Utc>,
        mb: &mut MetricsBuilder,
        errs: &ScrapeErrors,
    ) {
        let mut peers = self.peers.lock().await;
        let mut advertised = HashSet::new();

        for peer in parse_list(services) {
            let endpoint = match peer.parse::<Endpoint>() {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    errs.add_partial(1, ScrapeError::Connection(e.to_string()));
                    continue;
                }
            };
            if endpoint == self.seed {
                continue;
            }
            advertised.insert(endpoint.clone());

            if !peers.contains_key(&endpoint) {
                match Client::connect(endpoint.clone(), self.policy.clone()).await {
                    Ok(client) => {
                        tracing::debug!(receiver = %self.config.name, peer = %endpoint, "Connected to peer");
                        peers.insert(endpoint.clone(), client);
                    }
                    Err(e) => {
                        errs.add_partial(1, ScrapeError::Connection(format!("peer {endpoint}: {e}")));
                        continue;
                    }
                }
            }
            let Some(client) = peers.get(&endpoint) else {
                continue;
            };

            match client.info(&NODE_INFO_COMMANDS).await {
                Ok(info) => self.scrape_node(client, &info, now, mb, errs).await,
                Err(e) => errs.add_partial(
                    1,
                    ScrapeError::query(format!("{} on {}", NODE_INFO_COMMANDS.join(","), endpoint), e),
                ),
            }
        }

        let stale: Vec<Endpoint> = peers
            .keys()
            .filter(|e| !advertised.contains(*e))
            .cloned()
            .collect();
        for endpoint in stale {
            if let Some(client) = peers.remove(&endpoint) {
                tracing::info!(receiver = %self.config.name, peer = %endpoint, "Peer no longer advertised");
                if let Err(e) = client.close().await {
                    tracing::warn!(peer = %endpoint, error = %e, "Failed to close peer client");
                }
            }
        }
    }
}

impl std::fmt::Debug for AerospikeScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AerospikeScraper")
            .field("name", &self.config.name)
            .field("seed", &self.seed)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Scraper for AerospikeScraper {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &'static str {
        "aerospike"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    async fn start(&self) -> Result<(), ScrapeError> {
        tracing::debug!(receiver = %self.config.name, endpoint = %self.seed, "Starting aerospike receiver");
        let client = Client::connect(self.seed.clone(), self.policy.clone())
            .await
            .map_err(|e| ScrapeError::Connection(format!("failed to start: {e}")))?;
        *self.client.write() = Some(Arc::new(client));
        Ok(())
    }

    async fn scrape(&self) -> Result<ScrapeOutput, ScrapeError> {
        let client = self.seed_client()?;
        let mut mb = self.mb.lock().await;
        let errs = ScrapeErrors::new();
        let now = Utc::now();

        let info = client
            .info(&NODE_INFO_COMMANDS)
            .await
            .map_err(|e| ScrapeError::query(NODE_INFO_COMMANDS.join(","), e))?;

        self.scrape_node(&client, &info, now, &mut mb, &errs).await;

        if self.config.collect_cluster_metrics {
            let services = info.get("services").map(String::as_str).unwrap_or_default();
            self.scrape_peers(services, now, &mut mb, &errs).await;
        }

        Ok(ScrapeOutput::new(mb.emit(), errs))
    }

    async fn shutdown(&self) -> Result<(), ScrapeError> {
        let client = self.client.write().take();
        let mut result = Ok(());
        if let Some(client) = client {
            result = client
                .close()
                .await
                .map_err(|e| ScrapeError::Connection(format!("failed to close: {e}")));
        }

        for (endpoint, peer) in self.peers.lock().await.drain() {
            if let Err(e) = peer.close().await {
                tracing::warn!(peer = %endpoint, error = %e, "Failed to close peer client");
            }
        }
        tracing::debug!(receiver = %self.config.name, "Aerospike receiver stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AerospikeConfig::new("as1", "nohost:abc");
        let err = AerospikeScraper::new(config).unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }

    #[tokio::test]
    async fn test_scrape_before_start() {
        let scraper = AerospikeScraper::new(AerospikeConfig::new("as1", "localhost:3000")).unwrap();
        assert_eq!(scraper.kind(), "aerospike");
        assert!(matches!(
            scraper.scrape().await,
            Err(ScrapeError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_without_start_is_noop() {
        let scraper = AerospikeScraper::new(AerospikeConfig::new("as1", "localhost:3000")).unwrap();
        assert!(scraper.shutdown().await.is_ok());
        assert!(scraper.shutdown().await.is_ok());
    }
}
