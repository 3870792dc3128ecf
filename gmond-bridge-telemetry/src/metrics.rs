//! ## gmond-bridge-telemetry::metrics
//! Prometheus instruments describing the forwarding loop itself.
//!
//! They can be registered into the very registry the bridge forwards, in which
//! case gmond receives the bridge's own health next to the host metrics.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct ReporterMetrics {
    pub cycles: IntCounter,
    pub datagrams_sent: IntCounter,
    pub send_errors: IntCounter,
    pub excluded_samples: IntCounter,
    pub cycle_duration: Histogram,
}

impl ReporterMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let cycles = IntCounter::new(
            "gmond_bridge_cycles_total",
            "Forwarding cycles run against the collector",
        )?;
        let datagrams_sent = IntCounter::new(
            "gmond_bridge_datagrams_sent_total",
            "gmetric datagrams handed to the socket",
        )?;
        let send_errors = IntCounter::new(
            "gmond_bridge_send_errors_total",
            "Samples that could not be encoded or sent",
        )?;
        let excluded_samples = IntCounter::new(
            "gmond_bridge_excluded_samples_total",
            "Samples skipped by the exclusion filter",
        )?;
        let cycle_duration = Histogram::with_opts(
            HistogramOpts::new(
                "gmond_bridge_cycle_duration_seconds",
                "Time spent gathering, encoding and sending one cycle",
            )
            .buckets(vec![0.001, 0.005, 0.025, 0.1, 0.5, 2.5]),
        )?;

        Ok(Self {
            cycles,
            datagrams_sent,
            send_errors,
            excluded_samples,
            cycle_duration,
        })
    }

    /// Registers every instrument in `registry`.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.cycles.clone()))?;
        registry.register(Box::new(self.datagrams_sent.clone()))?;
        registry.register(Box::new(self.send_errors.clone()))?;
        registry.register(Box::new(self.excluded_samples.clone()))?;
        registry.register(Box::new(self.cycle_duration.clone()))?;
        Ok(())
    }

    /// Prometheus text exposition of `registry`, for diagnostics.
    pub fn render(registry: &Registry) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
