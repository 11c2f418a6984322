//! Aerospike receiver against a scripted info-protocol server.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use telescrape::pdata::NumberValue;
use telescrape::receiver::aerospike::protocol::{
    ADMIN_HEADER_LEN, FIELD_CLEAR_PASSWORD, FIELD_CREDENTIAL, FIELD_USER, HEADER_LEN, Header,
    MessageType, ResultCode, admin_reply,
};
use telescrape::receiver::aerospike::{
    AerospikeConfig, AerospikeScraper, AuthMode, Client, ClientError, ClientPolicy, Endpoint,
};
use telescrape::scraper::{ScrapeError, Scraper};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// =============================================================================
// Mock server
// =============================================================================

/// Scripted node: canned info values plus failure switches.
#[derive(Default)]
struct MockNode {
    values: HashMap<String, String>,
    logins: AtomicUsize,
    info_requests: AtomicUsize,
    /// Reply to this many upcoming info requests with an expired-session admin reply.
    expire_next: AtomicUsize,
    /// Once a session has expired, delay every later login and info reply.
    slow_after_expiry: Option<Duration>,
    expired: AtomicBool,
    /// Never answer info requests.
    silent: bool,
    /// Drop the connection when this command is requested.
    hang_up_on: Option<String>,
    /// Result code for every login.
    login_code: u8,
    /// Fields of the most recent login, as (id, value).
    last_login: parking_lot::Mutex<Vec<(u8, Vec<u8>)>>,
}

impl MockNode {
    fn standard() -> Self {
        let values = [
            ("namespaces", "test;bar"),
            ("node", "BB9000000000001"),
            (
                "statistics",
                "client_connections=10;bad_pair;client_connections_closed=3",
            ),
            ("services", ""),
            ("namespace/test", "memory_free_pct=80;client_read_success=12"),
            ("namespace/bar", "memory_free_pct=55;scan_basic_complete=4"),
        ];
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    async fn serve(self: Arc<Self>) -> Endpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let node = Arc::clone(&self);
                tokio::spawn(async move {
                    let _ = node.handle(socket).await;
                });
            }
        });
        Endpoint::new("127.0.0.1", port)
    }

    async fn handle(&self, mut socket: TcpStream) -> std::io::Result<()> {
        loop {
            let mut header = [0u8; HEADER_LEN];
            socket.read_exact(&mut header).await?;
            let header = Header::decode(&header).map_err(std::io::Error::other)?;
            let mut body = vec![0u8; header.length];
            socket.read_exact(&mut body).await?;

            match header.kind {
                MessageType::Admin => {
                    self.logins.fetch_add(1, Ordering::SeqCst);
                    *self.last_login.lock() = login_fields(&body);
                    self.stall().await;
                    socket.write_all(&admin_reply(ResultCode(self.login_code))).await?;
                }
                MessageType::Info => {
                    self.info_requests.fetch_add(1, Ordering::SeqCst);
                    if self.silent {
                        std::future::pending::<()>().await;
                    }
                    let expire = self
                        .expire_next
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok();
                    if expire {
                        self.expired.store(true, Ordering::SeqCst);
                        socket.write_all(&admin_reply(ResultCode::EXPIRED_SESSION)).await?;
                        continue;
                    }
                    self.stall().await;

                    let text = String::from_utf8_lossy(&body).into_owned();
                    let commands: Vec<&str> = text.split('\n').filter(|c| !c.is_empty()).collect();
                    if let Some(bad) = &self.hang_up_on
                        && commands.contains(&bad.as_str())
                    {
                        return Ok(());
                    }

                    let mut reply = String::new();
                    for command in commands {
                        let value = self.values.get(command).map(String::as_str).unwrap_or("");
                        reply.push_str(&format!("{command}\t{value}\n"));
                    }
                    let mut frame = Header::new(MessageType::Info, reply.len()).encode().to_vec();
                    frame.extend_from_slice(reply.as_bytes());
                    socket.write_all(&frame).await?;
                }
            }
        }
    }
}

impl MockNode {
    async fn stall(&self) {
        if let Some(delay) = self.slow_after_expiry
            && self.expired.load(Ordering::SeqCst)
        {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Split an admin body into its (id, value) fields.
fn login_fields(body: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut fields = Vec::new();
    let mut rest = &body[ADMIN_HEADER_LEN..];
    while rest.len() >= 5 {
        let len = u32::from_be_bytes(rest[..4].try_into().unwrap()) as usize;
        fields.push((rest[4], rest[5..4 + len].to_vec()));
        rest = &rest[4 + len..];
    }
    fields
}

fn config(endpoint: &Endpoint) -> AerospikeConfig {
    AerospikeConfig::new("as-test", endpoint.to_string()).with_timeout(Duration::from_secs(5))
}

// =============================================================================
// Scrape cycles
// =============================================================================

#[tokio::test]
async fn test_scrape_node_and_namespaces() {
    let node = Arc::new(MockNode::standard());
    let endpoint = Arc::clone(&node).serve().await;

    let scraper = AerospikeScraper::new(config(&endpoint)).unwrap();
    scraper.start().await.unwrap();
    let output = scraper.scrape().await.unwrap();
    scraper.shutdown().await.unwrap();

    assert!(output.partial.is_none());
    let metrics = output.metrics;

    let open: Vec<_> = metrics.data_points("aerospike.node.connection.open").collect();
    assert_eq!(open.len(), 1);
    let (resource, point) = open[0];
    assert_eq!(resource["aerospike.node.name"], "BB9000000000001");
    assert_eq!(point.value, NumberValue::Int(10));
    assert_eq!(point.attributes["type"], "client");

    let closed: Vec<_> = metrics.data_points("aerospike.node.connection.count").collect();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].1.value, NumberValue::Int(3));
    assert_eq!(closed[0].1.attributes["operation"], "close");

    let free: HashMap<String, NumberValue> = metrics
        .data_points("aerospike.namespace.memory.free")
        .map(|(r, dp)| (r["aerospike.namespace"].clone(), dp.value))
        .collect();
    assert_eq!(free["test"], NumberValue::Int(80));
    assert_eq!(free["bar"], NumberValue::Int(55));

    let (_, reads) = metrics
        .data_points("aerospike.namespace.transaction.count")
        .next()
        .unwrap();
    assert_eq!(reads.attributes["type"], "read");
    assert_eq!(reads.attributes["result"], "success");

    // node resource plus one per namespace
    assert_eq!(metrics.resource_metrics.len(), 3);
}

#[tokio::test]
async fn test_namespace_failure_is_partial() {
    let node = Arc::new(MockNode {
        hang_up_on: Some("namespace/bar".into()),
        ..MockNode::standard()
    });
    let endpoint = Arc::clone(&node).serve().await;

    let scraper = AerospikeScraper::new(config(&endpoint)).unwrap();
    scraper.start().await.unwrap();
    let output = scraper.scrape().await.unwrap();

    let partial = output.partial.expect("partial error");
    assert_eq!(partial.failed, 1);
    assert!(partial.message.contains("namespace/bar"));
    assert_eq!(
        output.metrics.data_points("aerospike.namespace.memory.free").count(),
        1
    );

    // the dropped connection is replaced on the next cycle
    let again = scraper.scrape().await.unwrap();
    assert!(again.partial.is_some());
    assert_eq!(
        again.metrics.data_points("aerospike.node.connection.open").count(),
        1
    );
}

#[tokio::test]
async fn test_cluster_peers_are_scraped() {
    let mut peer = MockNode::standard();
    peer.values.insert("node".into(), "BB9000000000002".into());
    let peer_endpoint = Arc::new(peer).serve().await;

    let mut seed = MockNode::standard();
    seed.values.insert("services".into(), peer_endpoint.to_string());
    let seed_endpoint = Arc::new(seed).serve().await;

    let scraper =
        AerospikeScraper::new(config(&seed_endpoint).with_cluster_metrics(true)).unwrap();
    scraper.start().await.unwrap();
    let output = scraper.scrape().await.unwrap();
    scraper.shutdown().await.unwrap();

    assert!(output.partial.is_none());
    let mut nodes: Vec<String> = output
        .metrics
        .data_points("aerospike.node.connection.open")
        .map(|(r, _)| r["aerospike.node.name"].clone())
        .collect();
    nodes.sort();
    assert_eq!(nodes, ["BB9000000000001", "BB9000000000002"]);
}

#[tokio::test]
async fn test_start_fails_when_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let scraper = AerospikeScraper::new(config(&Endpoint::new("127.0.0.1", port))).unwrap();
    let err = scraper.start().await.unwrap_err();
    assert!(matches!(err, ScrapeError::Connection(_)));
    assert!(matches!(scraper.scrape().await, Err(ScrapeError::NotStarted)));
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_expired_session_relogs_once() {
    let node = Arc::new(MockNode::standard());
    let endpoint = Arc::clone(&node).serve().await;

    let policy = ClientPolicy::new(Duration::from_secs(5)).with_credentials("admin", "admin");
    let client = Client::connect(endpoint, policy).await.unwrap();
    assert_eq!(node.logins.load(Ordering::SeqCst), 1);

    node.expire_next.store(1, Ordering::SeqCst);
    let resp = client.info(&["node"]).await.unwrap();
    assert_eq!(resp["node"], "BB9000000000001");
    assert_eq!(node.logins.load(Ordering::SeqCst), 2);
    assert_eq!(node.info_requests.load(Ordering::SeqCst), 2);

    client.close().await.unwrap();
    assert!(matches!(client.info(&["node"]).await, Err(ClientError::Closed)));
}

#[tokio::test]
async fn test_expired_twice_returns_error_after_one_relogin() {
    let node = Arc::new(MockNode::standard());
    let endpoint = Arc::clone(&node).serve().await;

    let policy = ClientPolicy::new(Duration::from_secs(5)).with_credentials("admin", "admin");
    let client = Client::connect(endpoint, policy).await.unwrap();

    node.expire_next.store(2, Ordering::SeqCst);
    let err = client.info(&["node"]).await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(node.logins.load(Ordering::SeqCst), 2);
    assert_eq!(node.info_requests.load(Ordering::SeqCst), 2);

    // the next call starts a fresh session
    assert!(client.info(&["node"]).await.is_ok());
    assert_eq!(node.logins.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_timeout_covers_relogin_and_retry() {
    let node = Arc::new(MockNode {
        slow_after_expiry: Some(Duration::from_millis(700)),
        ..MockNode::standard()
    });
    let endpoint = Arc::clone(&node).serve().await;

    let timeout = Duration::from_secs(1);
    let policy = ClientPolicy::new(timeout).with_credentials("admin", "admin");
    let client = Client::connect(endpoint, policy).await.unwrap();

    node.expire_next.store(1, Ordering::SeqCst);
    let started = Instant::now();
    let err = client.info(&["node"]).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ClientError::Timeout(t) if t == timeout));
    assert!(elapsed < timeout + Duration::from_millis(300), "took {elapsed:?}");
}

#[tokio::test]
async fn test_silent_node_fails_within_timeout() {
    let node = Arc::new(MockNode {
        silent: true,
        ..MockNode::standard()
    });
    let endpoint = Arc::clone(&node).serve().await;

    let timeout = Duration::from_millis(300);
    let client = Client::connect(endpoint, ClientPolicy::new(timeout)).await.unwrap();

    let started = Instant::now();
    let err = client.info(&["statistics"]).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(elapsed < timeout + Duration::from_millis(300), "took {elapsed:?}");
}

#[tokio::test]
async fn test_login_sends_hashed_credential() {
    let node = Arc::new(MockNode::standard());
    let endpoint = Arc::clone(&node).serve().await;

    let policy = ClientPolicy::new(Duration::from_secs(5)).with_credentials("admin", "admin");
    Client::connect(endpoint, policy).await.unwrap();

    let fields = node.last_login.lock().clone();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0], (FIELD_USER, b"admin".to_vec()));
    assert_eq!(fields[1].0, FIELD_CREDENTIAL);
    assert!(fields[1].1.starts_with(b"$2a$10$7EqJtq98hPqEX7fNZaFWoO"));
}

#[tokio::test]
async fn test_external_login_adds_clear_password() {
    let node = Arc::new(MockNode::standard());
    let endpoint = Arc::clone(&node).serve().await;

    let policy = ClientPolicy::new(Duration::from_secs(5))
        .with_credentials("ldap-user", "secret")
        .with_auth_mode(AuthMode::External);
    Client::connect(endpoint, policy).await.unwrap();

    let fields = node.last_login.lock().clone();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[1].0, FIELD_CREDENTIAL);
    assert_eq!(fields[2], (FIELD_CLEAR_PASSWORD, b"secret".to_vec()));
}

#[tokio::test]
async fn test_rejected_login() {
    let node = Arc::new(MockNode {
        login_code: ResultCode::INVALID_CREDENTIAL.0,
        ..MockNode::standard()
    });
    let endpoint = Arc::clone(&node).serve().await;

    let policy = ClientPolicy::new(Duration::from_secs(5)).with_credentials("admin", "wrong");
    let err = Client::connect(endpoint, policy).await.unwrap_err();
    assert!(matches!(err, ClientError::Auth(code) if code == ResultCode::INVALID_CREDENTIAL));
}

#[tokio::test]
async fn test_security_disabled_counts_as_login() {
    let node = Arc::new(MockNode {
        login_code: ResultCode::SECURITY_NOT_ENABLED.0,
        ..MockNode::standard()
    });
    let endpoint = Arc::clone(&node).serve().await;

    let policy = ClientPolicy::new(Duration::from_secs(5)).with_credentials("admin", "admin");
    let client = Client::connect(endpoint, policy).await.unwrap();
    assert!(client.info(&["namespaces"]).await.is_ok());
}
