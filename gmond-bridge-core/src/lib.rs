//! # gmond-bridge-core
//!
//! Forwards an in-process prometheus registry to a Ganglia gmond collector.
//!
//! ### Key Submodules:
//! - `reporter`: lifecycle adapter driven by the host (`init`/`start`/`stop`)
//! - `task`: periodic forwarding on a dedicated worker thread
//! - `endpoint`: UDP socket connected to the collector
//! - `sampler`: prometheus families flattened into gmond scalars
//! - `filter`: exclusion of samples by name

pub mod endpoint;
pub mod error;
pub mod filter;
pub mod reporter;
pub mod sampler;
pub mod task;

pub use error::ReporterError;
pub use reporter::{GangliaMetricsReporter, ReporterStatus, REPORTER_NAME};
