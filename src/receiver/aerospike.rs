//! Aerospike receiver.
//!
//! Polls a node over the binary info protocol and records node statistics
//! (`statistics`) and per-namespace statistics (`namespace/<name>`).
//!
//! # Example
//!
//! ```rust,no_run
//! use telescrape::receiver::aerospike::{AerospikeConfig, AerospikeScraper};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AerospikeConfig::new("as-local", "127.0.0.1:3000")
//!     .with_interval(Duration::from_secs(30));
//! let scraper = AerospikeScraper::new(config)?;
//! // controller.spawn(scraper).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connection;
pub mod metadata;
pub mod protocol;
mod scraper;

pub use client::{AuthMode, Client, ClientError, ClientPolicy, DEFAULT_PORT, Endpoint, EndpointError};
pub use config::AerospikeConfig;
pub use connection::InfoConnection;
pub use scraper::{AerospikeScraper, NODE_INFO_COMMANDS};
