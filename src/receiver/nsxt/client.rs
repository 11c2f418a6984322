//! NSX-T manager REST client.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::receiver::{TlsConfig, TlsError};

use super::model::{
    ClusterNode, ClusterNodeList, NetworkInterface, NetworkInterfaceList, NetworkInterfaceStats,
    NodeClass, NodeStatus, TransportNode, TransportNodeList, TransportNodeStatus,
};

/// REST client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("received 401 unauthorized status code")]
    Unauthorized,

    #[error("received 403 forbidden status code")]
    Forbidden,

    #[error("received {status} status code from {url}")]
    Status { status: u16, url: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Queries the receiver issues against a manager.
#[async_trait::async_trait]
pub trait NsxtClient: Send + Sync {
    /// Manager (cluster) nodes.
    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, ClientError>;

    /// Transport nodes.
    async fn transport_nodes(&self) -> Result<Vec<TransportNode>, ClientError>;

    /// Status of one node.
    async fn node_status(&self, node_id: &str, class: NodeClass) -> Result<NodeStatus, ClientError>;

    /// Network interfaces of one node.
    async fn interfaces(
        &self,
        node_id: &str,
        class: NodeClass,
    ) -> Result<Vec<NetworkInterface>, ClientError>;

    /// Counters of one interface.
    async fn interface_status(
        &self,
        node_id: &str,
        interface_id: &str,
        class: NodeClass,
    ) -> Result<NetworkInterfaceStats, ClientError>;
}

/// `reqwest`-backed client using HTTP basic auth.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl HttpClient {
    /// Build a client for `endpoint`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the TLS setup fails.
    pub fn new(
        endpoint: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
        tls: Option<&TlsConfig>,
    ) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint)?;
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(tls) = tls {
            builder = tls.apply(builder)?;
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            username: username.into(),
            password: password.into(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint.join(path)?;
        tracing::trace!(url = %url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(ClientError::Forbidden),
            status if !status.is_success() => {
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait::async_trait]
impl NsxtClient for HttpClient {
    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, ClientError> {
        let list: ClusterNodeList = self.get(NodeClass::Manager.path()).await?;
        Ok(list.results)
    }

    async fn transport_nodes(&self) -> Result<Vec<TransportNode>, ClientError> {
        let list: TransportNodeList = self.get(NodeClass::Transport.path()).await?;
        Ok(list.results)
    }

    async fn node_status(&self, node_id: &str, class: NodeClass) -> Result<NodeStatus, ClientError> {
        let path = format!("{}/{}/status", class.path(), node_id);
        match class {
            NodeClass::Manager => self.get(&path).await,
            NodeClass::Transport => {
                let status: TransportNodeStatus = self.get(&path).await?;
                Ok(status.node_status)
            }
        }
    }

    async fn interfaces(
        &self,
        node_id: &str,
        class: NodeClass,
    ) -> Result<Vec<NetworkInterface>, ClientError> {
        let path = format!("{}/{}/network/interfaces", class.path(), node_id);
        let list: NetworkInterfaceList = self.get(&path).await?;
        Ok(list.results)
    }

    async fn interface_status(
        &self,
        node_id: &str,
        interface_id: &str,
        class: NodeClass,
    ) -> Result<NetworkInterfaceStats, ClientError> {
        let path = format!(
            "{}/{}/network/interfaces/{}/stats",
            class.path(),
            node_id,
            interface_id
        );
        self.get(&path).await
    }
}
