//! Client TLS settings shared by receivers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TLS setup failures.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read CA file '{path}': {source}")]
    ReadCa {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS setup: {0}")]
    Native(#[from] native_tls::Error),

    #[error("invalid TLS setup: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client-side TLS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM file with additional trusted root certificates.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// Name to verify the server certificate against (defaults to the host).
    #[serde(default)]
    pub server_name: Option<String>,
    /// Skip certificate and hostname verification.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    fn read_ca(&self) -> Result<Option<Vec<u8>>, TlsError> {
        match &self.ca_file {
            Some(path) => std::fs::read(path)
                .map(Some)
                .map_err(|source| TlsError::ReadCa {
                    path: path.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Build a `native-tls` connector for raw TCP protocols.
    pub fn native_connector(&self) -> Result<native_tls::TlsConnector, TlsError> {
        let mut builder = native_tls::TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        if let Some(pem) = self.read_ca()? {
            builder.add_root_certificate(native_tls::Certificate::from_pem(&pem)?);
        }
        Ok(builder.build()?)
    }

    /// Apply these settings to an HTTP client builder.
    pub fn apply(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, TlsError> {
        if self.insecure_skip_verify {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        if let Some(pem) = self.read_ca()? {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        Ok(builder)
    }

    /// SNI name for `host`.
    pub fn server_name<'a>(&'a self, host: &'a str) -> &'a str {
        self.server_name.as_deref().unwrap_or(host)
    }
}
