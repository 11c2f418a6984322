//! NSX-T receiver.
//!
//! Polls an NSX-T manager's REST API for transport nodes and manager-role
//! cluster nodes, then records each node's system status and per-interface
//! counters. Node queries of one cycle run concurrently.

mod client;
mod config;
pub mod metadata;
pub mod model;
mod scraper;

pub use client::{ClientError, HttpClient, NsxtClient};
pub use config::NsxtConfig;
pub use scraper::NsxtScraper;
