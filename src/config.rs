//! Configuration for the telescrape binary.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Receivers (`receivers.aerospike[]`, `receivers.nsxt[]`), optionally merged
//!   from a `receiver_path` directory
//! - Exporters (`exporters.file`)
//!
//! Credentials accept `${VAR}` and `${VAR:-default}` references, expanded when
//! a receiver builds its client.

mod app;
mod receivers;
mod validation;

pub use app::{AppConfig, ExportersConfig};
pub use receivers::ReceiversConfig;
pub use validation::{ConfigError, expand_env_vars, parse_duration};
