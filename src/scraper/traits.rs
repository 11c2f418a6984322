//! The receiver trait and its cycle schedule.

use std::str::FromStr;
use std::time::Duration;

use super::errors::{ScrapeError, ScrapeOutput};
use crate::config::ConfigError;

/// Shortest gap allowed between two collection cycles.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// When a receiver's collection cycles fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// A cycle every `Duration`, never shorter than [`MIN_INTERVAL`].
    Interval(Duration),

    /// Six-field cron expression (`sec min hour dom month dow`), e.g.
    /// `"*/30 * * * * *"` for twice a minute.
    Cron(String),
}

impl Schedule {
    /// Fixed-period schedule; periods under [`MIN_INTERVAL`] are raised to it.
    pub fn interval(period: Duration) -> Self {
        let period = if period < MIN_INTERVAL {
            tracing::warn!(
                requested = ?period,
                applied = ?MIN_INTERVAL,
                "Collection interval too short, raising to minimum"
            );
            MIN_INTERVAL
        } else {
            period
        };
        Self::Interval(period)
    }

    /// Cron schedule, parsed up front so a bad expression fails at config time.
    pub fn cron(expr: impl Into<String>) -> Result<Self, ScrapeError> {
        let expr = expr.into();
        if let Err(e) = cron::Schedule::from_str(&expr) {
            return Err(ScrapeError::Config(ConfigError::ValidationError(format!(
                "invalid cron expression '{expr}': {e}"
            ))));
        }
        Ok(Self::Cron(expr))
    }

    /// Resolve a receiver's optional `interval`/`cron` pair.
    ///
    /// Cron takes precedence; config validation rejects setting both.
    pub fn from_parts(
        interval: Option<Duration>,
        cron: Option<&str>,
        default: Duration,
    ) -> Result<Self, ScrapeError> {
        if let Some(expr) = cron {
            return Self::cron(expr);
        }
        Ok(Self::interval(interval.unwrap_or(default)))
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval(period) => write!(f, "interval {}", humantime::format_duration(*period)),
            Self::Cron(expr) => write!(f, "cron '{expr}'"),
        }
    }
}

/// A polling source that turns a remote system's statistics into metrics.
///
/// # Lifecycle
///
/// 1. `start`: open the administrative connection. A failure here is a
///    connection error and the scraper is never scheduled.
/// 2. `scrape`: run one collection cycle. Cycles never overlap.
/// 3. `shutdown`: release the connection. Calling it twice is harmless.
///
/// # Error Handling
///
/// `scrape` distinguishes **cycle failures** from **partial failures**:
///
/// - A failed mandatory discovery query (connection lost, authorization
///   rejected) returns `Err`, and no batch is produced.
/// - Failures on individual entities or fields are accumulated and returned
///   in [`ScrapeOutput::partial`] alongside whatever was recorded.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync + 'static {
    /// Unique identifier for this scraper instance.
    fn name(&self) -> &str;

    /// Receiver type (e.g., "aerospike", "nsxt").
    fn kind(&self) -> &'static str;

    /// Execution schedule.
    fn schedule(&self) -> &Schedule;

    /// Establish the administrative connection.
    async fn start(&self) -> Result<(), ScrapeError>;

    /// Perform one collection cycle.
    async fn scrape(&self) -> Result<ScrapeOutput, ScrapeError>;

    /// Release the administrative connection.
    async fn shutdown(&self) -> Result<(), ScrapeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_interval_is_raised() {
        assert_eq!(
            Schedule::interval(Duration::from_millis(250)),
            Schedule::Interval(MIN_INTERVAL)
        );
    }

    #[test]
    fn test_interval_display() {
        let schedule = Schedule::interval(Duration::from_secs(90));
        assert_eq!(schedule, Schedule::Interval(Duration::from_secs(90)));
        assert_eq!(schedule.to_string(), "interval 1m 30s");
    }

    #[test]
    fn test_cron_accepts_six_fields() {
        let schedule = Schedule::cron("*/30 * * * * *").unwrap();
        assert_eq!(schedule, Schedule::Cron("*/30 * * * * *".to_string()));
        assert_eq!(schedule.to_string(), "cron '*/30 * * * * *'");
    }

    #[test]
    fn test_cron_rejects_garbage() {
        let err = Schedule::cron("every five minutes").unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
        assert!(err.to_string().contains("invalid cron expression 'every five minutes'"));
    }

    #[test]
    fn test_schedule_from_parts() {
        let default = Duration::from_secs(60);
        assert_eq!(
            Schedule::from_parts(None, None, default).unwrap(),
            Schedule::Interval(default)
        );
        assert_eq!(
            Schedule::from_parts(Some(Duration::from_secs(10)), None, default).unwrap(),
            Schedule::Interval(Duration::from_secs(10))
        );
        assert!(matches!(
            Schedule::from_parts(None, Some("0 * * * * *"), default).unwrap(),
            Schedule::Cron(_)
        ));
        assert!(Schedule::from_parts(None, Some("0 * *"), default).is_err());
    }
}
