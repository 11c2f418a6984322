//! Aerospike receiver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, expand_env_vars};
use crate::pdata::MetricsSettings;
use crate::receiver::TlsConfig;
use crate::scraper::{ScrapeError, Schedule};

use super::client::{AuthMode, ClientPolicy, Endpoint, EndpointError};
use super::metadata::ALL_METRICS;

/// Default collection interval (60 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default round-trip timeout (20 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "localhost:3000".to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Configuration for one Aerospike receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AerospikeConfig {
    /// Unique receiver name.
    pub name: String,
    /// Seed node address, `host:port` (default: localhost:3000).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Enable this receiver (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Login user; supports `${VAR}` expansion.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password; supports `${VAR}` expansion.
    #[serde(default)]
    pub password: Option<String>,
    /// `internal` (default) or `external` for directory-backed users.
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// TLS settings; plain TCP when absent.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    /// Deadline for each info call, re-login included (default: 20s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Collection interval (mutually exclusive with cron).
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    /// Cron schedule expression (mutually exclusive with interval).
    #[serde(default)]
    pub cron: Option<String>,
    /// Also poll every peer the seed node advertises.
    #[serde(default)]
    pub collect_cluster_metrics: bool,
    /// Per-metric toggles.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl AerospikeConfig {
    /// Create a configuration with defaults for everything but name and endpoint.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            enabled: true,
            username: None,
            password: None,
            auth_mode: AuthMode::Internal,
            tls: None,
            timeout: DEFAULT_TIMEOUT,
            interval: None,
            cron: None,
            collect_cluster_metrics: false,
            metrics: MetricsSettings::new(),
        }
    }

    /// Set login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set how the server checks credentials.
    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Set TLS settings.
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Set the round-trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the collection interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set a cron schedule.
    pub fn with_cron(mut self, cron: impl Into<String>) -> Self {
        self.cron = Some(cron.into());
        self
    }

    /// Enable or disable cluster-wide collection.
    pub fn with_cluster_metrics(mut self, enabled: bool) -> Self {
        self.collect_cluster_metrics = enabled;
        self
    }

    /// Set per-metric toggles.
    pub fn with_metrics(mut self, metrics: MetricsSettings) -> Self {
        self.metrics = metrics;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| {
            ConfigError::ValidationError(format!("aerospike receiver '{}': {}", self.name, msg))
        };

        self.endpoint
            .parse::<Endpoint>()
            .map_err(|e| invalid(e.to_string()))?;
        if self.timeout.is_zero() {
            return Err(invalid("timeout must be positive".to_string()));
        }
        if self.interval.is_some() && self.cron.is_some() {
            return Err(invalid("cannot specify both interval and cron".to_string()));
        }
        self.schedule().map_err(|e| invalid(e.to_string()))?;
        if self.username.is_some() != self.password.is_some() {
            return Err(invalid("username and password must be set together".to_string()));
        }
        self.metrics.validate(&ALL_METRICS).map_err(invalid)?;
        Ok(())
    }

    /// Execution schedule.
    pub fn schedule(&self) -> Result<Schedule, ScrapeError> {
        Schedule::from_parts(self.interval, self.cron.as_deref(), DEFAULT_INTERVAL)
    }

    /// Parsed seed endpoint.
    pub fn seed(&self) -> Result<Endpoint, ConfigError> {
        self.endpoint
            .parse()
            .map_err(|e: EndpointError| ConfigError::ValidationError(e.to_string()))
    }

    /// Client policy with credentials expanded from the environment.
    pub fn client_policy(&self) -> ClientPolicy {
        let mut policy = ClientPolicy::new(self.timeout).with_auth_mode(self.auth_mode);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            policy = policy.with_credentials(expand_env_vars(user), expand_env_vars(pass));
        }
        if let Some(tls) = &self.tls {
            policy = policy.with_tls(tls.clone());
        }
        policy
    }
}
