//! telescrape binary entry point.
//!
//! Loads the configuration, starts every enabled receiver on its schedule and
//! forwards each batch to the configured exporter until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use telescrape::{
    config::{AppConfig, parse_duration},
    consumer::MetricsConsumer,
    exporter::{FileExporter, LoggingExporter},
    receiver::{aerospike::AerospikeScraper, nsxt::NsxtScraper},
    scraper::{ControllerError, Scraper, ScraperController},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// telescrape - scrape Aerospike and NSX-T statistics into telemetry batches
#[derive(Parser, Debug)]
#[command(name = "telescrape", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "TELESCRAPE_CONFIG"
    )]
    config: String,

    /// Time allowed for in-flight cycles to finish on shutdown
    #[arg(long, default_value = "5s", value_parser = parse_duration, env = "TELESCRAPE_SHUTDOWN_TIMEOUT")]
    shutdown_timeout: Duration,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telescrape=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!(path = %cli.config, "Loading configuration");
    let config = AppConfig::load_with_receiver_path(&cli.config)?;

    let file_exporter = config
        .exporters
        .file
        .as_ref()
        .map(|file| Arc::new(FileExporter::new(file)));
    let consumer: Arc<dyn MetricsConsumer> = match &file_exporter {
        Some(exporter) => {
            tracing::info!(path = %exporter.path().display(), "Exporting to file");
            Arc::clone(exporter) as Arc<dyn MetricsConsumer>
        }
        None => {
            tracing::info!("No exporter configured, logging batches");
            Arc::new(LoggingExporter::new())
        }
    };

    let controller = ScraperController::new(consumer).await?;
    let mut started = 0usize;

    for receiver in config.receivers.aerospike.into_iter().filter(|r| r.enabled) {
        let name = receiver.name.clone();
        match AerospikeScraper::new(receiver) {
            Ok(scraper) => started += spawn_receiver(&controller, scraper).await,
            Err(e) => tracing::error!(receiver = %name, error = %e, "Invalid receiver"),
        }
    }
    for receiver in config.receivers.nsxt.into_iter().filter(|r| r.enabled) {
        let name = receiver.name.clone();
        match NsxtScraper::new(receiver) {
            Ok(scraper) => started += spawn_receiver(&controller, scraper).await,
            Err(e) => tracing::error!(receiver = %name, error = %e, "Invalid receiver"),
        }
    }

    tracing::info!(receivers = started, "Receivers started");
    controller.start().await?;
    tracing::info!("Press Ctrl+C to shutdown");

    shutdown_signal().await;

    tracing::info!("Shutting down receivers...");
    if let Err(e) = controller.shutdown_with_timeout(cli.shutdown_timeout).await {
        tracing::error!(error = %e, "Failed to shutdown receivers");
    }

    if let Some(exporter) = file_exporter {
        tracing::info!("Closing file exporter...");
        if let Err(e) = exporter.shutdown() {
            tracing::error!(error = %e, "Failed to close file exporter");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Register one scraper; a receiver that cannot start is skipped.
async fn spawn_receiver<S: Scraper>(controller: &ScraperController, scraper: S) -> usize {
    match controller.spawn(scraper).await {
        Ok(_) => 1,
        Err(ControllerError::Start { name, source }) => {
            tracing::error!(receiver = %name, error = %source, "Receiver failed to start, skipping");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to register receiver");
            0
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
