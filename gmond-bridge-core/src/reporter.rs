//! Lifecycle adapter exposing the forwarding task to a host process.
//!
//! The host calls `init` once with its configuration and may later toggle
//! forwarding through the management surface (`start`/`stop`). None of these
//! calls fail: problems reaching the collector are logged and leave the
//! reporter disabled, so a broken metrics setup never takes the host down.

use std::sync::Arc;
use std::time::Duration;

use gmond_bridge_config::{BridgeConfig, Properties};
use gmond_bridge_telemetry::ReporterMetrics;
use parking_lot::Mutex;
use prometheus::Registry;
use tracing::{debug, error, info};

use crate::error::ReporterError;
use crate::task::{ForwardingTask, TaskSettings};

/// Fixed management identifier of the reporter.
pub const REPORTER_NAME: &str = "gmond_bridge:type=GangliaMetricsReporter";

/// What a host plugin loader calls when it brings a reporter up.
pub trait MetricsReporter {
    fn init(&self, properties: &Properties);
}

/// Runtime management surface.
pub trait ReporterManagement {
    fn name(&self) -> &'static str;
    fn start(&self, interval_secs: u64);
    fn stop(&self);
    fn status(&self) -> ReporterStatus;
}

/// Point-in-time view of the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterStatus {
    pub initialized: bool,
    pub running: bool,
    /// Collector `host:port`, once initialized.
    pub target: Option<String>,
}

#[derive(Default)]
struct ReporterState {
    initialized: bool,
    running: bool,
    settings: Option<Arc<TaskSettings>>,
    /// `None` only after a failed rebuild in `stop`.
    task: Option<ForwardingTask>,
}

/// Forwards a prometheus registry to gmond under a host-controlled lifecycle.
pub struct GangliaMetricsReporter {
    registry: Registry,
    metrics: Option<ReporterMetrics>,
    state: Mutex<ReporterState>,
}

impl GangliaMetricsReporter {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            metrics: None,
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// Also record cycle statistics in `metrics`.
    pub fn with_metrics(mut self, metrics: ReporterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One-time setup. Later calls are ignored.
    ///
    /// Connects to the collector and, if `ganglia.enabled` is set, starts
    /// forwarding at `metrics.polling_interval_secs`. On failure the error is
    /// logged and the reporter stays uninitialized.
    pub fn init(&self, config: &BridgeConfig) {
        let mut state = self.state.lock();
        if state.initialized {
            debug!("reporter already initialized");
            return;
        }

        let settings = match TaskSettings::from_config(&config.ganglia) {
            Ok(settings) => Arc::new(settings),
            Err(e) => {
                error!(error = %e, "invalid ganglia reporter settings");
                return;
            }
        };
        let task = match self.connect(&settings) {
            Ok(task) => task,
            Err(e) => {
                error!(error = %e, "ganglia reporter disabled");
                return;
            }
        };

        info!(
            collector = %settings.target(),
            group = %settings.group,
            exclude = settings.filter.pattern().unwrap_or(""),
            "ganglia reporter initialized"
        );
        state.initialized = true;
        state.settings = Some(settings);
        state.task = Some(task);

        if config.ganglia.enabled {
            self.start_locked(&mut state, config.metrics.polling_interval_secs);
        }
    }

    /// [`init`](Self::init) from a flat host property map.
    pub fn init_from_properties(&self, properties: &Properties) {
        match BridgeConfig::from_properties(properties) {
            Ok(config) => self.init(&config),
            Err(e) => error!(error = %e, "ganglia reporter configuration rejected"),
        }
    }

    /// Starts forwarding every `interval_secs` (at least one second).
    /// Ignored unless initialized and stopped.
    pub fn start(&self, interval_secs: u64) {
        let mut state = self.state.lock();
        self.start_locked(&mut state, interval_secs);
    }

    /// Stops forwarding and prepares a fresh task for the next `start`.
    /// Ignored unless running.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.initialized || !state.running {
            debug!("reporter not running, nothing to stop");
            return;
        }

        // Release the old socket before binding the next one.
        if let Some(mut task) = state.task.take() {
            task.shutdown();
        }
        state.running = false;

        let Some(settings) = state.settings.clone() else {
            return;
        };
        match self.connect(&settings) {
            Ok(task) => state.task = Some(task),
            Err(e) => error!(error = %e, "could not prepare forwarding task after stop"),
        }
    }

    pub fn name(&self) -> &'static str {
        REPORTER_NAME
    }

    pub fn status(&self) -> ReporterStatus {
        let state = self.state.lock();
        ReporterStatus {
            initialized: state.initialized,
            running: state.running,
            target: state.settings.as_ref().map(|s| s.target()),
        }
    }

    fn start_locked(&self, state: &mut ReporterState, interval_secs: u64) {
        if !state.initialized || state.running {
            debug!(
                initialized = state.initialized,
                running = state.running,
                "start ignored"
            );
            return;
        }

        if state.task.is_none() {
            let Some(settings) = state.settings.clone() else {
                return;
            };
            match self.connect(&settings) {
                Ok(task) => state.task = Some(task),
                Err(e) => {
                    error!(error = %e, "could not rebuild forwarding task");
                    return;
                }
            }
        }

        let period = Duration::from_secs(interval_secs.max(1));
        if let Some(task) = state.task.as_mut() {
            match task.start(period) {
                Ok(_) => state.running = true,
                Err(e) => error!(error = %e, "could not start forwarding"),
            }
        }
    }

    fn connect(&self, settings: &Arc<TaskSettings>) -> Result<ForwardingTask, ReporterError> {
        ForwardingTask::connect(
            self.registry.clone(),
            Arc::clone(settings),
            self.metrics.clone(),
        )
    }
}

impl MetricsReporter for GangliaMetricsReporter {
    fn init(&self, properties: &Properties) {
        self.init_from_properties(properties);
    }
}

impl ReporterManagement for GangliaMetricsReporter {
    fn name(&self) -> &'static str {
        REPORTER_NAME
    }

    fn start(&self, interval_secs: u64) {
        GangliaMetricsReporter::start(self, interval_secs);
    }

    fn stop(&self) {
        GangliaMetricsReporter::stop(self);
    }

    fn status(&self) -> ReporterStatus {
        GangliaMetricsReporter::status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::tests::FakeCollector;
    use gmond_bridge_config::GangliaConfig;
    use gmond_bridge_protocol::GangliaMessage;
    use prometheus::{Counter, Gauge};
    use tracing_test::traced_test;

    fn registry() -> Registry {
        let registry = Registry::new();
        let counter = Counter::new("requests_total", "Requests served").unwrap();
        counter.inc();
        registry.register(Box::new(counter)).unwrap();
        registry
    }

    fn config(port: u16, enabled: bool) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.ganglia = GangliaConfig {
            host: "127.0.0.1".into(),
            port,
            group: "kafka".into(),
            enabled,
            ..Default::default()
        };
        config.metrics.polling_interval_secs = 1;
        config
    }

    #[test]
    fn test_name() {
        let reporter = GangliaMetricsReporter::new(Registry::new());
        assert_eq!(reporter.name(), "gmond_bridge:type=GangliaMetricsReporter");
        assert_eq!(ReporterManagement::name(&reporter), REPORTER_NAME);
    }

    #[test]
    fn test_init_disabled_stays_stopped() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.init(&config(collector.port(), false));

        let status = reporter.status();
        assert!(status.initialized);
        assert!(!status.running);
        assert_eq!(status.target, Some(format!("127.0.0.1:{}", collector.port())));
    }

    #[test]
    fn test_init_enabled_starts_forwarding() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.init(&config(collector.port(), true));

        assert!(reporter.status().running);
        let Some(GangliaMessage::Metadata(meta)) = collector.recv() else {
            panic!("expected metadata");
        };
        assert_eq!(meta.id.name, "kafka.requests_total");
        reporter.stop();
    }

    #[traced_test]
    #[test]
    fn test_second_init_is_ignored() {
        let first = FakeCollector::bind();
        let second = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());

        reporter.init(&config(first.port(), false));
        reporter.init(&config(second.port(), true));

        let status = reporter.status();
        assert!(!status.running);
        assert_eq!(status.target, Some(format!("127.0.0.1:{}", first.port())));
        assert!(logs_contain("reporter already initialized"));
    }

    #[test]
    fn test_start_before_init_is_ignored() {
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.start(1);
        assert_eq!(
            reporter.status(),
            ReporterStatus {
                initialized: false,
                running: false,
                target: None
            }
        );
    }

    #[test]
    fn test_stop_when_not_running_is_ignored() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.stop();
        assert!(!reporter.status().initialized);

        reporter.init(&config(collector.port(), false));
        reporter.stop();
        let status = reporter.status();
        assert!(status.initialized);
        assert!(!status.running);
    }

    #[test]
    fn test_stop_then_start_resumes() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.init(&config(collector.port(), false));

        reporter.start(0);
        assert!(reporter.status().running);
        assert!(collector.recv().is_some());

        reporter.stop();
        assert!(!reporter.status().running);
        collector.set_timeout(Duration::from_millis(200));
        while collector.recv().is_some() {}

        collector.set_timeout(Duration::from_secs(3));
        reporter.start(1);
        assert!(reporter.status().running);
        assert!(matches!(collector.recv(), Some(GangliaMessage::Metadata(_))));
        reporter.stop();
    }

    #[traced_test]
    #[test]
    fn test_second_start_is_ignored() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.init(&config(collector.port(), true));
        reporter.start(5);
        assert!(reporter.status().running);
        assert!(logs_contain("start ignored"));

        // Two consecutive cycles well inside the ignored 5s period.
        assert!(matches!(collector.recv(), Some(GangliaMessage::Metadata(_))));
        assert!(matches!(collector.recv(), Some(GangliaMessage::Value(_))));
        collector.set_timeout(Duration::from_millis(2500));
        assert!(matches!(collector.recv(), Some(GangliaMessage::Metadata(_))));

        reporter.stop();
        assert!(!reporter.status().running);
    }

    #[test]
    fn test_exclude_regex_drops_matching_metrics() {
        let collector = FakeCollector::bind();
        let registry = registry();
        let gauge = Gauge::new("jvm_threads", "Live threads").unwrap();
        registry.register(Box::new(gauge)).unwrap();

        let mut config = config(collector.port(), true);
        config.ganglia.exclude_regex = Some("jvm_.*".into());
        let reporter = GangliaMetricsReporter::new(registry);
        reporter.init(&config);

        collector.set_timeout(Duration::from_millis(1500));
        let first = collector.recv().unwrap();
        let second = collector.recv().unwrap();
        reporter.stop();

        assert_eq!(first.metric_name(), "kafka.requests_total");
        assert_eq!(second.metric_name(), "kafka.requests_total");
    }

    #[traced_test]
    #[test]
    fn test_unreachable_endpoint_leaves_reporter_uninitialized() {
        let reporter = GangliaMetricsReporter::new(registry());
        let mut config = config(8649, true);
        config.ganglia.host = String::new();

        reporter.init(&config);
        let status = reporter.status();
        assert!(!status.initialized);
        assert!(!status.running);
        assert!(logs_contain("ganglia reporter disabled"));

        reporter.start(1);
        assert!(!reporter.status().running);
    }

    #[traced_test]
    #[test]
    fn test_invalid_properties_are_logged() {
        let reporter = GangliaMetricsReporter::new(registry());
        let props: Properties = [("ganglia.metrics.port", "not-a-port")].into_iter().collect();
        MetricsReporter::init(&reporter, &props);
        assert!(!reporter.status().initialized);
        assert!(logs_contain("configuration rejected"));
    }

    #[test]
    fn test_init_from_properties() {
        let collector = FakeCollector::bind();
        let port = collector.port().to_string();
        let props: Properties = [
            ("ganglia.metrics.host", "127.0.0.1"),
            ("ganglia.metrics.port", port.as_str()),
            ("ganglia.metrics.group", "broker"),
        ]
        .into_iter()
        .collect();

        let reporter = GangliaMetricsReporter::new(registry());
        MetricsReporter::init(&reporter, &props);
        assert!(reporter.status().initialized);

        reporter.start(1);
        let Some(GangliaMessage::Metadata(meta)) = collector.recv() else {
            panic!("expected metadata");
        };
        assert_eq!(meta.group(), Some("broker"));
        reporter.stop();
    }

    #[test]
    fn test_start_rebuilds_missing_task() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.init(&config(collector.port(), false));
        reporter.state.lock().task = None;

        reporter.start(1);
        assert!(reporter.status().running);
        assert!(collector.recv().is_some());
        reporter.stop();
    }

    #[traced_test]
    #[test]
    fn test_failed_rebuild_keeps_reporter_stopped() {
        let collector = FakeCollector::bind();
        let reporter = GangliaMetricsReporter::new(registry());
        reporter.init(&config(collector.port(), false));
        {
            let mut state = reporter.state.lock();
            state.task = None;
            let mut settings = crate::task::tests::settings(collector.port());
            settings.host = String::new();
            state.settings = Some(Arc::new(settings));
        }

        reporter.start(1);
        let status = reporter.status();
        assert!(status.initialized);
        assert!(!status.running);
        assert!(logs_contain("could not rebuild forwarding task"));
    }

    #[test]
    fn test_reporter_metrics_are_recorded() {
        let collector = FakeCollector::bind();
        let registry = registry();
        let metrics = ReporterMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        let reporter = GangliaMetricsReporter::new(registry).with_metrics(metrics.clone());
        reporter.init(&config(collector.port(), true));
        assert!(collector.recv().is_some());
        reporter.stop();

        assert!(metrics.cycles.get() >= 1);
    }
}
