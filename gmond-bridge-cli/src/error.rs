use gmond_bridge_config::ConfigError;
use gmond_bridge_core::ReporterError;
use gmond_bridge_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reporter(#[from] ReporterError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to wait for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),

    /// The reporter could not reach the collector; details were logged.
    #[error("Reporter for {target} failed to initialize")]
    NotInitialized { target: String },
}
