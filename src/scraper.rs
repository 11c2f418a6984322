//! Scrape Layer
//!
//! The shared scrape-and-translate core used by every receiver.
//!
//! # Architecture
//!
//! - [`parse`]: splits `key=value;...` info blobs into a [`StatMap`]
//! - [`MetricTable`]: static field-name to metric mapping
//! - [`ScrapeErrors`]: thread-safe partial-error accumulator
//! - [`Scraper`]: the receiver trait (`start`, `scrape`, `shutdown`)
//! - [`ScraperController`]: schedules cycles and forwards batches

mod controller;
mod errors;
pub mod parse;
mod table;
mod traits;

pub use controller::{
    ControllerError, CycleStatus, DEFAULT_SHUTDOWN_TIMEOUT, JobInfo, ScraperController, run_cycle,
};
pub use errors::{PartialScrapeError, ScrapeError, ScrapeErrors, ScrapeOutput};
pub use parse::{ConversionError, StatMap};
pub use table::{FieldRecorder, MetricTable};
pub use traits::{MIN_INTERVAL, Schedule, Scraper};
