use gmond_bridge_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReporterError {
    /// The collector address could not be resolved, bound or connected.
    #[error("Collector endpoint {target} unavailable: {source}")]
    EndpointUnavailable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid exclusion pattern: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error("Failed to send to {target}: {source}")]
    Send {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {metric}: {source}")]
    Encode {
        metric: String,
        #[source]
        source: ProtocolError,
    },

    #[error("Failed to spawn forwarding thread: {0}")]
    Spawn(#[source] std::io::Error),
}
