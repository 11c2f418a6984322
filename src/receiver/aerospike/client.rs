//! Administrative client for one Aerospike node.
//!
//! Wraps an [`InfoConnection`] with the client policy. The policy timeout
//! bounds each whole [`Client::info`] call, reconnects and re-login included.
//! A session that expires is re-established once per call. Connections
//! dropped after an I/O failure are re-opened on the next call.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::receiver::TlsConfig;

use super::connection::InfoConnection;
use super::protocol::{self, ProtocolError, RawResponse, ResultCode};

/// Default Aerospike service port.
pub const DEFAULT_PORT: u16 = 3000;

/// Administrative client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connect failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS setup or handshake failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// Read or write on an open connection failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The round trip exceeded the policy timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The peer sent a malformed frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The password could not be hashed.
    #[error("failed to prepare credentials: {0}")]
    Credential(String),

    /// The server rejected the credentials or the request.
    #[error("authentication failed: {0}")]
    Auth(ResultCode),

    /// The server invalidated the session.
    #[error("session expired")]
    SessionExpired,

    /// The client was closed.
    #[error("client is closed")]
    Closed,
}

impl ClientError {
    /// Whether the underlying connection is unusable after this error.
    fn poisons_connection(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout(_) | Self::Protocol(_) | Self::SessionExpired
        )
    }
}

/// Errors parsing a `host:port` endpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid endpoint '{0}': expected host:port")]
    BadEndpoint(String),

    #[error("invalid port in endpoint '{0}'")]
    BadPort(String),
}

/// Address of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    /// Parse `host:port`, `[v6]:port`, or a bare host using [`DEFAULT_PORT`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || EndpointError::BadEndpoint(s.to_string());

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(bad)?;
            match tail.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if tail.is_empty() => (host, None),
                None => return Err(bad()),
            }
        } else {
            match s.split_once(':') {
                Some((host, port)) if !port.contains(':') => (host, Some(port)),
                Some(_) => return Err(bad()),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(bad());
        }
        let port = match port {
            Some(p) => p
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| EndpointError::BadPort(s.to_string()))?,
            None => DEFAULT_PORT,
        };
        Ok(Self::new(host, port))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// How the server checks credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthMode {
    /// Users managed by the server; only the hashed password is sent.
    #[default]
    Internal,
    /// Users managed by an external directory; the clear password is sent too.
    External,
}

/// Timeout, credentials and TLS for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPolicy {
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_mode: AuthMode,
    pub tls: Option<TlsConfig>,
}

impl ClientPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            username: None,
            password: None,
            auth_mode: AuthMode::default(),
            tls: None,
        }
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

enum State {
    Open(InfoConnection),
    Disconnected,
    Closed,
}

/// Login fields, hashed once per client.
struct Login {
    user: String,
    credential: String,
    clear_password: Option<String>,
}

impl Login {
    async fn prepare(user: &str, password: &str, mode: AuthMode) -> Result<Self, ClientError> {
        let owned = password.to_owned();
        let credential = tokio::task::spawn_blocking(move || protocol::hash_password(&owned))
            .await
            .map_err(|e| ClientError::Credential(e.to_string()))?
            .map_err(|e| ClientError::Credential(e.to_string()))?;
        Ok(Self {
            user: user.to_owned(),
            credential,
            clear_password: (mode == AuthMode::External).then(|| password.to_owned()),
        })
    }
}

/// Client for one node.
pub struct Client {
    endpoint: Endpoint,
    policy: ClientPolicy,
    tls: Option<tokio_native_tls::TlsConnector>,
    login: Option<Login>,
    state: Mutex<State>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.policy.timeout)
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect and, when credentials are set, log in.
    ///
    /// # Errors
    /// Any failure to establish the session, including a timeout.
    pub async fn connect(endpoint: Endpoint, policy: ClientPolicy) -> Result<Self, ClientError> {
        let tls = match &policy.tls {
            Some(cfg) => Some(tokio_native_tls::TlsConnector::from(
                cfg.native_connector().map_err(|e| ClientError::Tls(e.to_string()))?,
            )),
            None => None,
        };
        let login = match policy.credentials() {
            Some((user, password)) => Some(Login::prepare(user, password, policy.auth_mode).await?),
            None => None,
        };

        let client = Self {
            endpoint,
            policy,
            tls,
            login,
            state: Mutex::new(State::Disconnected),
        };
        let conn = client.with_timeout(client.open_session()).await?;
        *client.state.lock().await = State::Open(conn);
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Query `commands` in one round trip.
    ///
    /// On session expiry the client logs in again and retries exactly once.
    /// The policy timeout covers the whole call; a call that runs out of time
    /// leaves the client disconnected.
    pub async fn info(&self, commands: &[&str]) -> Result<RawResponse, ClientError> {
        let mut state = self.state.lock().await;
        let mut slot = match std::mem::replace(&mut *state, State::Disconnected) {
            State::Open(conn) => Some(conn),
            State::Disconnected => None,
            State::Closed => {
                *state = State::Closed;
                return Err(ClientError::Closed);
            }
        };

        let result = self
            .with_timeout(self.exchange(&mut slot, commands))
            .await;

        match (slot, &result) {
            (Some(_), Err(e)) if e.poisons_connection() => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "Dropping connection");
            }
            (Some(conn), _) => *state = State::Open(conn),
            (None, _) => {}
        }
        result
    }

    /// Close the connection. Further calls are no-ops.
    pub async fn close(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, State::Closed) {
            State::Open(conn) => conn.close().await,
            State::Disconnected | State::Closed => Ok(()),
        }
    }

    /// Run one query, reconnecting or logging in again as needed.
    ///
    /// The connection is moved out of `slot` while in use, so a caller that
    /// abandons this future finds the slot empty.
    async fn exchange(
        &self,
        slot: &mut Option<InfoConnection>,
        commands: &[&str],
    ) -> Result<RawResponse, ClientError> {
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => {
                tracing::debug!(endpoint = %self.endpoint, "Reconnecting");
                self.open_session().await?
            }
        };

        let mut result = conn.request_info(commands).await;
        if matches!(result, Err(ClientError::SessionExpired)) {
            tracing::info!(endpoint = %self.endpoint, "Session expired, logging in again");
            conn = self.open_session().await?;
            result = conn.request_info(commands).await;
        }
        *slot = Some(conn);
        result
    }

    async fn open_session(&self) -> Result<InfoConnection, ClientError> {
        let tls = self
            .tls
            .as_ref()
            .zip(self.policy.tls.as_ref())
            .map(|(connector, cfg)| (connector, cfg.server_name(&self.endpoint.host)));
        let mut conn = InfoConnection::connect(&self.endpoint, tls).await?;
        if let Some(login) = &self.login {
            conn.login(&login.user, &login.credential, login.clear_password.as_deref())
                .await?;
        }
        Ok(conn)
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        tokio::time::timeout(self.policy.timeout, fut)
            .await
            .map_err(|_| ClientError::Timeout(self.policy.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(
            "localhost:3000".parse::<Endpoint>().unwrap(),
            Endpoint::new("localhost", 3000)
        );
        assert_eq!(
            "10.0.0.5".parse::<Endpoint>().unwrap(),
            Endpoint::new("10.0.0.5", DEFAULT_PORT)
        );
        assert_eq!(
            "[::1]:3100".parse::<Endpoint>().unwrap(),
            Endpoint::new("::1", 3100)
        );
    }

    #[test]
    fn test_endpoint_parse_errors() {
        assert!(matches!(
            ":3000".parse::<Endpoint>(),
            Err(EndpointError::BadEndpoint(_))
        ));
        assert!(matches!(
            "host:port".parse::<Endpoint>(),
            Err(EndpointError::BadPort(_))
        ));
        assert!(matches!(
            "host:0".parse::<Endpoint>(),
            Err(EndpointError::BadPort(_))
        ));
        assert!(matches!(
            "a:b:c".parse::<Endpoint>(),
            Err(EndpointError::BadEndpoint(_))
        ));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("db1", 3000).to_string(), "db1:3000");
        assert_eq!(Endpoint::new("::1", 3000).to_string(), "[::1]:3000");
    }

    #[test]
    fn test_policy_credentials() {
        let policy = ClientPolicy::new(Duration::from_secs(1));
        assert!(policy.credentials().is_none());

        let policy = policy.with_credentials("admin", "secret");
        assert_eq!(policy.credentials(), Some(("admin", "secret")));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Client::connect(
            Endpoint::new("127.0.0.1", port),
            ClientPolicy::new(Duration::from_secs(2)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
