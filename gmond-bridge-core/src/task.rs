//! Periodic forwarding of a prometheus registry to the collector.
//!
//! A [`ForwardingTask`] owns the collector endpoint and, once started, a worker
//! thread that runs one cycle per period: gather, sample, filter, encode, send.
//! Cycles are never interrupted; shutting down only prevents the next one.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Sender};
use crossbeam::select;
use gmond_bridge_config::GangliaConfig;
use gmond_bridge_protocol::gmetric::{DESC_KEY, GROUP_KEY, SPOOF_HOST_KEY};
use gmond_bridge_protocol::{GangliaMessage, MetadataMessage, MetricId, ValueMessage};
use gmond_bridge_telemetry::{BridgeLogger, ReporterMetrics};
use prometheus::Registry;
use tracing::{debug, error, info, warn};

use crate::endpoint::CollectorEndpoint;
use crate::error::ReporterError;
use crate::filter::MetricFilter;
use crate::sampler::{collect_samples, GangliaSample};

const WORKER_THREAD_NAME: &str = "gmond-bridge-forwarder";
const VALUE_TYPE: &str = "double";

/// Everything a task needs to reach the collector and label samples.
#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub host: String,
    pub port: u16,
    pub group: String,
    pub filter: MetricFilter,
    /// `ip:hostname` reported instead of the sender.
    pub spoof: Option<String>,
    pub tmax: u32,
    pub dmax: u32,
    pub multicast_ttl: u32,
}

impl TaskSettings {
    pub fn from_config(config: &GangliaConfig) -> Result<Self, ReporterError> {
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            group: config.group.clone(),
            filter: MetricFilter::from_pattern(config.exclude_pattern())?,
            spoof: config.spoof.clone(),
            tmax: config.tmax,
            dmax: config.dmax,
            multicast_ttl: config.multicast_ttl,
        })
    }

    /// `host:port` of the collector.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outcome of one forwarding cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Samples whose metadata and value both reached the socket.
    pub sent: usize,
    pub excluded: usize,
    pub errors: usize,
}

/// State shared between the task handle and its worker thread.
struct Forwarder {
    registry: Registry,
    endpoint: CollectorEndpoint,
    settings: Arc<TaskSettings>,
    metrics: Option<ReporterMetrics>,
    host_id: String,
}

impl Forwarder {
    fn run_cycle(&self) -> CycleSummary {
        let span = BridgeLogger::cycle_span(self.endpoint.target(), &self.settings.group);
        let _enter = span.enter();
        let started = Instant::now();

        let mut summary = CycleSummary::default();
        for sample in collect_samples(&self.registry.gather()) {
            if !self.settings.filter.allows(&sample.name) {
                summary.excluded += 1;
                continue;
            }
            match self.send_sample(&sample) {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    warn!(metric = %sample.name, error = %e, "failed to forward sample");
                    summary.errors += 1;
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.cycles.inc();
            metrics.datagrams_sent.inc_by(2 * summary.sent as u64);
            metrics.send_errors.inc_by(summary.errors as u64);
            metrics.excluded_samples.inc_by(summary.excluded as u64);
            metrics
                .cycle_duration
                .observe(started.elapsed().as_secs_f64());
        }

        debug!(
            sent = summary.sent,
            excluded = summary.excluded,
            errors = summary.errors,
            "cycle finished"
        );
        summary
    }

    fn send_sample(&self, sample: &GangliaSample) -> Result<(), ReporterError> {
        for message in messages_for(&self.settings, &self.host_id, sample) {
            let datagram = message.encode().map_err(|source| ReporterError::Encode {
                metric: message.metric_name().to_string(),
                source,
            })?;
            self.endpoint.send(&datagram)?;
        }
        Ok(())
    }
}

/// Metadata and value messages announcing `sample`, named `<group>.<name>`.
///
/// `host_id` is reported as the sender unless the settings spoof another host.
pub fn messages_for(
    settings: &TaskSettings,
    host_id: &str,
    sample: &GangliaSample,
) -> [GangliaMessage; 2] {
    let name = format!("{}.{}", settings.group, sample.name);
    let id = match &settings.spoof {
        Some(spoof) => MetricId::new(spoof.as_str(), name, true),
        None => MetricId::new(host_id, name, false),
    };

    let mut extra = vec![(GROUP_KEY.to_string(), settings.group.clone())];
    if !sample.description.is_empty() {
        extra.push((DESC_KEY.to_string(), sample.description.clone()));
    }
    if let Some(spoof) = &settings.spoof {
        extra.push((SPOOF_HOST_KEY.to_string(), spoof.clone()));
    }

    let metadata = MetadataMessage {
        id: id.clone(),
        value_type: VALUE_TYPE.to_string(),
        units: sample.units.to_string(),
        slope: sample.slope,
        tmax: settings.tmax,
        dmax: settings.dmax,
        extra,
    };
    let value = ValueMessage::new(id, sample.value.to_string());
    [metadata.into(), value.into()]
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Forwarding task bound to one registry and one collector endpoint.
pub struct ForwardingTask {
    forwarder: Arc<Forwarder>,
    worker: Option<Worker>,
}

impl ForwardingTask {
    /// Connects to the collector. Nothing is sent until [`start`](Self::start)
    /// or [`report_once`](Self::report_once).
    pub fn connect(
        registry: Registry,
        settings: Arc<TaskSettings>,
        metrics: Option<ReporterMetrics>,
    ) -> Result<Self, ReporterError> {
        let endpoint =
            CollectorEndpoint::connect(&settings.host, settings.port, settings.multicast_ttl)?;
        let host_id = endpoint
            .local_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default();

        Ok(Self {
            forwarder: Arc::new(Forwarder {
                registry,
                endpoint,
                settings,
                metrics,
                host_id,
            }),
            worker: None,
        })
    }

    /// Spawns the worker. The first cycle runs one `period` from now.
    ///
    /// Returns `Ok(false)` if the task is already running.
    pub fn start(&mut self, period: Duration) -> Result<bool, ReporterError> {
        if self.worker.is_some() {
            return Ok(false);
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let forwarder = Arc::clone(&self.forwarder);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let ticker = channel::tick(period);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            // Ticks and stop can be ready together.
                            if stop_rx.try_recv().is_ok() {
                                break;
                            }
                            forwarder.run_cycle();
                        }
                    }
                }
                debug!("forwarding worker exited");
            })
            .map_err(ReporterError::Spawn)?;

        info!(
            collector = self.forwarder.endpoint.target(),
            period_secs = period.as_secs_f64(),
            "forwarding started"
        );
        self.worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
        Ok(true)
    }

    /// Stops the worker and waits for it. A cycle in flight completes first.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                error!("forwarding worker panicked");
            }
            info!(collector = self.forwarder.endpoint.target(), "forwarding stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Runs one cycle on the calling thread.
    pub fn report_once(&self) -> CycleSummary {
        self.forwarder.run_cycle()
    }
}

impl Drop for ForwardingTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
