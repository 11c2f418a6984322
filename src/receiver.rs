//! Receivers: polling sources that translate remote statistics into metrics.
//!
//! - [`aerospike`]: Aerospike node and namespace statistics over the info protocol
//! - [`nsxt`]: NSX-T manager, transport node and interface statistics over REST

pub mod aerospike;
pub mod nsxt;
mod tls;

pub use tls::{TlsConfig, TlsError};
