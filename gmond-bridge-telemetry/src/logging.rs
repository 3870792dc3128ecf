//! ## gmond-bridge-telemetry::logging
//! Structured logging with tracing.
//!
//! The bridge usually runs inside a host process that may already own the
//! global subscriber, so installation never panics: a second install is
//! reported and ignored.

use tracing::{info_span, Span};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset and none is given.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Clone, Copy, Debug, Default)]
pub struct BridgeLogger;

impl BridgeLogger {
    /// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
    ///
    /// Returns false when a global subscriber was already set.
    pub fn init_with_filter(default_filter: &str) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .is_ok()
    }

    /// Span wrapping one forwarding cycle towards `collector`.
    #[inline]
    pub fn cycle_span(collector: &str, group: &str) -> Span {
        info_span!("forwarding_cycle", collector = collector, group = group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_cycle_span_fields() {
        let span = BridgeLogger::cycle_span("localhost:8649", "kafka");
        span.in_scope(|| tracing::info!(sent = 3, "cycle finished"));
        assert!(logs_contain("cycle finished"));
        assert!(logs_contain("localhost:8649"));
    }
}
