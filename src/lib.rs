//! telescrape - scrape-and-translate receivers for telemetry pipelines
//!
//! Receivers poll remote systems on a schedule, translate their statistics
//! into typed metric batches, and hand each batch to a consumer. The binary
//! wires configured receivers to a JSON-lines file exporter.
//!
//! # Architecture
//!
//! - **Receivers** ([`receiver`]): Aerospike (binary info protocol) and NSX-T (REST)
//! - **Scrape layer** ([`scraper`]): parsing, metric tables, partial errors, scheduling
//! - **Data model** ([`pdata`]): metrics, traces and logs with a metrics builder
//! - **Exporters** ([`exporter`]): rotating JSON-lines file, logging fallback
//! - **Configuration** ([`config`]): YAML loading and validation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telescrape::{
//!     AerospikeConfig, AerospikeScraper, FileExporter, FileExporterConfig, ScraperController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = Arc::new(FileExporter::new(&FileExporterConfig::new("metrics.json")));
//!     let controller = ScraperController::new(exporter).await?;
//!
//!     let scraper = AerospikeScraper::new(AerospikeConfig::new("as-local", "127.0.0.1:3000"))?;
//!     controller.spawn(scraper).await?;
//!     controller.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     controller.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod exporter;
pub mod pdata;
pub mod receiver;
pub mod scraper;

pub use config::{AppConfig, ConfigError};
pub use consumer::{Capabilities, ConsumerError, LogsConsumer, MetricsConsumer, TracesConsumer};
pub use exporter::{FileExporter, FileExporterConfig, LoggingExporter};
pub use pdata::{Logs, Metrics, MetricsBuilder, Traces};
pub use receiver::aerospike::{AerospikeConfig, AerospikeScraper};
pub use receiver::nsxt::{NsxtConfig, NsxtScraper};
pub use scraper::{ScrapeError, ScrapeOutput, Scraper, ScraperController};
