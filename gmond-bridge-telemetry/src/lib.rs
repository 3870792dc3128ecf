//! # gmond-bridge Telemetry
//!
//! Logging setup and the bridge's own metrics.

pub mod logging;
pub mod metrics;

pub use logging::BridgeLogger;
pub use metrics::ReporterMetrics;
