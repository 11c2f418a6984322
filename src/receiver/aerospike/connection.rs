//! A single info-protocol connection to one Aerospike node.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::client::{ClientError, Endpoint};
use super::protocol::{self, HEADER_LEN, Header, MessageType, ProtocolError, RawResponse};

trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// Plain or TLS stream speaking the info protocol.
///
/// Requests are strictly sequential: one request, one reply.
pub struct InfoConnection {
    stream: Box<dyn Stream>,
    peer: String,
}

impl std::fmt::Debug for InfoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoConnection")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl InfoConnection {
    /// Open a TCP connection, wrapping it in TLS when a connector is given.
    pub async fn connect(
        endpoint: &Endpoint,
        tls: Option<(&tokio_native_tls::TlsConnector, &str)>,
    ) -> Result<Self, ClientError> {
        let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|source| ClientError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        tcp.set_nodelay(true).ok();

        let stream: Box<dyn Stream> = match tls {
            Some((connector, server_name)) => Box::new(
                connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| ClientError::Tls(format!("TLS handshake failed: {e}")))?,
            ),
            None => Box::new(tcp),
        };

        tracing::debug!(endpoint = %endpoint, tls = tls.is_some(), "Info connection opened");
        Ok(Self {
            stream,
            peer: endpoint.to_string(),
        })
    }

    /// Authenticate with a hashed credential, plus the clear password for
    /// external authentication.
    pub async fn login(
        &mut self,
        user: &str,
        credential: &str,
        clear_password: Option<&str>,
    ) -> Result<(), ClientError> {
        let (header, body) = self
            .round_trip(&protocol::login_request(user, credential, clear_password))
            .await?;
        if header.kind != MessageType::Admin {
            return Err(ProtocolError::UnexpectedType(header.kind).into());
        }
        let code = protocol::admin_result_code(&body)?;
        if !code.is_login_ok() {
            return Err(ClientError::Auth(code));
        }
        tracing::debug!(peer = %self.peer, user = %user, "Login succeeded");
        Ok(())
    }

    /// Issue all `commands` in one round trip.
    ///
    /// An admin-typed reply means the server rejected the session.
    pub async fn request_info(&mut self, commands: &[&str]) -> Result<RawResponse, ClientError> {
        let (header, body) = self.round_trip(&protocol::info_request(commands)).await?;
        match header.kind {
            MessageType::Info => Ok(protocol::parse_info_response(&body)),
            MessageType::Admin => {
                let code = protocol::admin_result_code(&body)?;
                if code.is_session_expired() {
                    Err(ClientError::SessionExpired)
                } else {
                    Err(ClientError::Auth(code))
                }
            }
        }
    }

    /// Shut down the write side and drop the stream.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        tracing::debug!(peer = %self.peer, "Info connection closed");
        Ok(())
    }

    async fn round_trip(&mut self, request: &[u8]) -> Result<(Header, Vec<u8>), ClientError> {
        self.stream.write_all(request).await?;
        self.stream.flush().await?;

        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let header = Header::decode(&header)?;

        let mut body = vec![0u8; header.length];
        self.stream.read_exact(&mut body).await?;
        Ok((header, body))
    }
}
