//! Scrape error taxonomy and partial-error accumulation.

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::ConfigError;
use crate::pdata::Metrics;

use super::parse::ConversionError;

/// Errors raised while starting or running a scrape cycle.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Session could not be established or re-established.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query round trip failed.
    #[error("query '{query}' failed: {reason}")]
    Query { query: String, reason: String },

    /// A field value could not be converted to its metric's numeric type.
    #[error("failed to convert field '{field}' value '{value}': {source}")]
    Conversion {
        field: String,
        value: String,
        #[source]
        source: ConversionError,
    },

    /// Invalid configuration detected before any cycle runs.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// `scrape` was called before a successful `start`.
    #[error("scraper has not been started")]
    NotStarted,
}

impl ScrapeError {
    /// Build a query error from any displayable failure.
    pub fn query(query: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Query {
            query: query.into(),
            reason: reason.to_string(),
        }
    }
}

/// Combined, non-fatal errors from one cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{failed} partial scrape error(s): {message}")]
pub struct PartialScrapeError {
    /// Number of items (fields, entities) that failed.
    pub failed: usize,
    /// Individual error messages joined with `"; "`.
    pub message: String,
}

/// Thread-safe, append-only accumulator of partial errors.
///
/// Shared by reference between the tasks of one cycle; never aborts the cycle.
#[derive(Debug, Default)]
pub struct ScrapeErrors {
    errors: Mutex<Vec<(usize, ScrapeError)>>,
}

impl ScrapeErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a partial failure affecting `failed` items.
    pub fn add_partial(&self, failed: usize, err: ScrapeError) {
        tracing::debug!(failed, error = %err, "Partial scrape error");
        self.errors.lock().push((failed, err));
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Move every recorded error into a new accumulator, leaving this one empty.
    pub fn take(&self) -> Self {
        Self {
            errors: Mutex::new(std::mem::take(&mut *self.errors.lock())),
        }
    }

    /// Combine into a single error, or `None` if nothing failed.
    pub fn combine(self) -> Option<PartialScrapeError> {
        let errors = self.errors.into_inner();
        if errors.is_empty() {
            return None;
        }
        let failed = errors.iter().map(|(n, _)| n).sum();
        let message = errors
            .iter()
            .map(|(_, e)| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Some(PartialScrapeError { failed, message })
    }
}

/// Result of a completed cycle: the batch plus any partial errors.
#[derive(Debug, Default)]
pub struct ScrapeOutput {
    pub metrics: Metrics,
    pub partial: Option<PartialScrapeError>,
}

impl ScrapeOutput {
    /// Bundle a batch with the combined errors of its cycle.
    pub fn new(metrics: Metrics, errs: ScrapeErrors) -> Self {
        Self {
            metrics,
            partial: errs.combine(),
        }
    }

    /// True if the cycle completed with at least one partial error.
    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }
}
