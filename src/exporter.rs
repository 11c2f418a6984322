//! Exporters: consumers that move finished batches out of the process.
//!
//! - [`FileExporter`]: JSON lines to a size-rotated file
//! - [`LoggingExporter`]: batch summaries through `tracing`

mod file;
mod logging;
mod rotation;

pub use file::{FileExporter, FileExporterConfig, JsonMarshaler};
pub use logging::LoggingExporter;
pub use rotation::{RotatingFile, RotationConfig};
