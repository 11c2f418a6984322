//! Scraper controller: schedules cycles and forwards batches to a consumer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::consumer::MetricsConsumer;

use super::errors::ScrapeError;
use super::traits::{Schedule, Scraper};

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by the controller itself.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The scraper could not connect during `start`.
    #[error("failed to start scraper '{name}': {source}")]
    Start {
        name: String,
        #[source]
        source: ScrapeError,
    },

    /// Scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// One or more scrapers failed to shut down cleanly.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Metadata about a registered job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job UUID.
    pub id: uuid::Uuid,
    /// Scraper name.
    pub name: String,
    /// Receiver type.
    pub kind: String,
    /// Schedule description.
    pub schedule: String,
}

/// Outcome of one scheduled cycle, as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStatus {
    /// Cycle completed without errors.
    Complete { data_points: usize },
    /// Cycle completed; some entities or fields failed.
    Partial { data_points: usize, failed: usize },
    /// Cycle failed; nothing was forwarded.
    Failed,
}

struct Registered {
    info: JobInfo,
    scraper: Arc<dyn Scraper>,
}

/// Runs registered scrapers on their schedules.
///
/// Uses `tokio-cron-scheduler`. Each scraper is started (connected) when it
/// is registered and shut down with the controller.
pub struct ScraperController {
    scheduler: JobScheduler,
    jobs: Arc<RwLock<HashMap<uuid::Uuid, Registered>>>,
    consumer: Arc<dyn MetricsConsumer>,
}

impl ScraperController {
    /// Create a controller that forwards every batch to `consumer`.
    pub async fn new(consumer: Arc<dyn MetricsConsumer>) -> Result<Self, ControllerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| ControllerError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            consumer,
        })
    }
}

impl std::fmt::Debug for ScraperController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperController")
            .field(
                "job_count",
                &self.jobs.try_read().map(|j| j.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl ScraperController {
    /// Start a scraper and register it with the scheduler.
    ///
    /// # Errors
    /// Returns `ControllerError::Start` if the scraper cannot connect.
    pub async fn spawn<S: Scraper>(&self, scraper: S) -> Result<uuid::Uuid, ControllerError> {
        let name = scraper.name().to_string();
        let kind = scraper.kind().to_string();
        let schedule = scraper.schedule().clone();

        scraper
            .start()
            .await
            .map_err(|source| ControllerError::Start {
                name: name.clone(),
                source,
            })?;

        let scraper: Arc<dyn Scraper> = Arc::new(scraper);
        let job = self.create_job(Arc::clone(&scraper), &schedule)?;
        let job_id = match self.scheduler.add(job).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(err) = scraper.shutdown().await {
                    tracing::warn!(receiver = %name, error = %err, "Shutdown after failed registration");
                }
                return Err(ControllerError::Scheduler(e.to_string()));
            }
        };

        self.jobs.write().await.insert(
            job_id,
            Registered {
                info: JobInfo {
                    id: job_id,
                    name: name.clone(),
                    kind: kind.clone(),
                    schedule: schedule.to_string(),
                },
                scraper,
            },
        );

        tracing::info!(receiver = %name, kind = %kind, job_id = %job_id, schedule = %schedule, "Scraper registered");
        Ok(job_id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), ControllerError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| ControllerError::Scheduler(e.to_string()))?;
        tracing::info!("Scraper scheduler started");
        Ok(())
    }

    /// List all registered jobs.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .read()
            .await
            .values()
            .map(|r| r.info.clone())
            .collect()
    }

    /// Get the number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Remove a job and shut its scraper down.
    pub async fn remove(&self, job_id: &uuid::Uuid) -> Result<(), ControllerError> {
        self.scheduler
            .remove(job_id)
            .await
            .map_err(|e| ControllerError::Scheduler(e.to_string()))?;

        if let Some(registered) = self.jobs.write().await.remove(job_id) {
            if let Err(e) = registered.scraper.shutdown().await {
                tracing::warn!(receiver = %registered.info.name, error = %e, "Scraper shutdown failed");
            }
            tracing::info!(receiver = %registered.info.name, job_id = %job_id, "Scraper removed");
        }
        Ok(())
    }

    /// Gracefully shutdown with the default timeout.
    pub async fn shutdown(self) -> Result<(), ControllerError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Stop the scheduler, then shut down every scraper.
    pub async fn shutdown_with_timeout(mut self, timeout: Duration) -> Result<(), ControllerError> {
        let job_count = self.jobs.read().await.len();
        match tokio::time::timeout(timeout, self.scheduler.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Scraper scheduler shutdown failed");
                return Err(ControllerError::Scheduler(e.to_string()));
            }
            Err(_) => tracing::warn!(job_count, "Scraper scheduler shutdown timed out"),
        }

        let mut failures = Vec::new();
        for (_, registered) in self.jobs.write().await.drain() {
            if let Err(e) = registered.scraper.shutdown().await {
                tracing::warn!(receiver = %registered.info.name, error = %e, "Scraper shutdown failed");
                failures.push(format!("{}: {}", registered.info.name, e));
            }
        }

        tracing::info!(job_count, "Scraper controller shutdown complete");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::Shutdown(failures.join("; ")))
        }
    }

    // --- Private helpers ---

    fn create_job(
        &self,
        scraper: Arc<dyn Scraper>,
        schedule: &Schedule,
    ) -> Result<Job, ControllerError> {
        let consumer = Arc::clone(&self.consumer);

        let make_callback = move || {
            let (scraper, consumer) = (Arc::clone(&scraper), Arc::clone(&consumer));
            move |_: uuid::Uuid, _: JobScheduler| {
                let (scraper, consumer) = (Arc::clone(&scraper), Arc::clone(&consumer));
                Box::pin(async move {
                    run_cycle(scraper.as_ref(), consumer.as_ref()).await;
                }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
            }
        };

        match schedule {
            Schedule::Interval(d) => Job::new_repeated_async(*d, make_callback()),
            Schedule::Cron(expr) => Job::new_cron_job_async(expr.as_str(), make_callback()),
        }
        .map_err(|e| ControllerError::Scheduler(e.to_string()))
    }
}

/// Execute a single cycle and forward the batch.
///
/// A failed cycle is logged and nothing is forwarded; the next tick retries.
pub async fn run_cycle(scraper: &dyn Scraper, consumer: &dyn MetricsConsumer) -> CycleStatus {
    let name = scraper.name();
    let start = std::time::Instant::now();
    tracing::debug!(receiver = %name, "Running scrape cycle");

    let output = match scraper.scrape().await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(receiver = %name, error = %e, "Scrape cycle failed");
            return CycleStatus::Failed;
        }
    };

    let data_points = output.metrics.data_point_count();
    let duration_ms = start.elapsed().as_millis();
    let status = match &output.partial {
        Some(partial) => {
            tracing::warn!(receiver = %name, failed = partial.failed, error = %partial, duration_ms, "Scrape cycle completed with partial errors");
            CycleStatus::Partial {
                data_points,
                failed: partial.failed,
            }
        }
        None => {
            tracing::debug!(receiver = %name, data_points, duration_ms, "Scrape cycle succeeded");
            CycleStatus::Complete { data_points }
        }
    };

    if !output.metrics.is_empty()
        && let Err(e) = consumer.consume_metrics(output.metrics).await
    {
        tracing::error!(receiver = %name, error = %e, "Failed to forward metrics");
    }

    status
}
