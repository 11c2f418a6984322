//! NSX-T receiver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, expand_env_vars};
use crate::pdata::MetricsSettings;
use crate::receiver::TlsConfig;
use crate::scraper::{ScrapeError, Schedule};

use super::client::{ClientError, HttpClient};
use super::metadata::ALL_METRICS;

/// Default collection interval (60 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Configuration for one NSX-T receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NsxtConfig {
    /// Unique receiver name.
    pub name: String,
    /// Manager base URL (http or https).
    pub endpoint: String,
    /// Enable this receiver (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Basic-auth user; supports `${VAR}` expansion.
    pub username: String,
    /// Basic-auth password; supports `${VAR}` expansion.
    pub password: String,
    /// TLS settings for https endpoints.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    /// Per-request timeout (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Collection interval (mutually exclusive with cron).
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    /// Cron schedule expression (mutually exclusive with interval).
    #[serde(default)]
    pub cron: Option<String>,
    /// Per-metric toggles.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl NsxtConfig {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            enabled: true,
            username: username.into(),
            password: password.into(),
            tls: None,
            timeout: DEFAULT_TIMEOUT,
            interval: None,
            cron: None,
            metrics: MetricsSettings::new(),
        }
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

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
            ConfigError::ValidationError(format!("nsxt receiver '{}': {}", self.name, msg))
        };

        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| invalid(format!("invalid endpoint '{}': {}", self.endpoint, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!(
                "endpoint scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.username.is_empty() {
            return Err(invalid("username not provided and is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(invalid("password not provided and is required".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout must be positive".to_string()));
        }
        if self.interval.is_some() && self.cron.is_some() {
            return Err(invalid("cannot specify both interval and cron".to_string()));
        }
        self.schedule().map_err(|e| invalid(e.to_string()))?;
        self.metrics.validate(&ALL_METRICS).map_err(invalid)?;
        Ok(())
    }

    /// Execution schedule.
    pub fn schedule(&self) -> Result<Schedule, ScrapeError> {
        Schedule::from_parts(self.interval, self.cron.as_deref(), DEFAULT_INTERVAL)
    }

    /// Build the HTTP client with credentials expanded from the environment.
    pub fn http_client(&self) -> Result<HttpClient, ClientError> {
        HttpClient::new(
            &self.endpoint,
            expand_env_vars(&self.username),
            expand_env_vars(&self.password),
            self.timeout,
            self.tls.as_ref(),
        )
    }
}
