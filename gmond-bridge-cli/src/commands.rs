use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use gmond_bridge_config::{BridgeConfig, Properties};
use gmond_bridge_core::endpoint::CollectorEndpoint;
use gmond_bridge_core::sampler::collect_samples;
use gmond_bridge_core::task::{messages_for, TaskSettings};
use gmond_bridge_core::GangliaMetricsReporter;
use gmond_bridge_protocol::GangliaMessage;
use gmond_bridge_telemetry::logging::DEFAULT_FILTER;
use gmond_bridge_telemetry::ReporterMetrics;
use prometheus::Registry;
use tracing::info;

use crate::error::CliError;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = DEFAULT_FILTER)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forward the bridge's metrics to gmond until interrupted
    Run(RunArgs),
    /// Validate the configuration and resolve the collector
    Check(ConfigArgs),
    /// Print the datagrams one forwarding cycle would send, hex encoded
    Dump(DumpArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// YAML configuration file (default: config/gmond-bridge.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host property override, e.g. `-D ganglia.metrics.host=gmond.local`
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = Properties::parse_pair)]
    pub properties: Vec<(String, String)>,
}

impl ConfigArgs {
    /// Files and environment first, then `-D` overrides.
    pub fn load(&self) -> Result<BridgeConfig, CliError> {
        let figment = match &self.config {
            Some(path) => BridgeConfig::figment_from_path(path)?,
            None => BridgeConfig::figment(),
        };
        let overrides: Properties = self.properties.iter().cloned().collect();
        Ok(BridgeConfig::extract(figment.merge(overrides))?)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Seconds between cycles, overriding metrics.polling.interval.secs
    #[arg(short, long)]
    pub interval: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Sender host written into unspoofed metric ids
    #[arg(long, default_value = "localhost")]
    pub host_id: String,

    /// Also print each datagram decoded
    #[arg(long)]
    pub decode: bool,
}

pub async fn run_command(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check(args) => check(&args),
        Commands::Dump(args) => {
            for line in dump(&args)? {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let mut config = args.config.load()?;
    if let Some(interval) = args.interval {
        config.metrics.polling_interval_secs = interval;
    }

    let registry = Registry::new();
    let metrics = ReporterMetrics::new()?;
    metrics.register(&registry)?;

    let reporter = GangliaMetricsReporter::new(registry).with_metrics(metrics);
    reporter.init(&config);
    if !reporter.status().initialized {
        return Err(CliError::NotInitialized {
            target: config.ganglia.target(),
        });
    }
    reporter.start(config.metrics.polling_interval_secs);

    info!(
        reporter = reporter.name(),
        collector = %config.ganglia.target(),
        "running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await.map_err(CliError::Signal)?;

    reporter.stop();
    info!("shutdown complete");
    Ok(())
}

fn check(args: &ConfigArgs) -> Result<(), CliError> {
    let config = args.load()?;
    let ganglia = &config.ganglia;
    println!("configuration ok");
    println!("  collector:  {}", ganglia.target());
    println!("  group:      {}", ganglia.group);
    println!("  exclude:    {}", ganglia.exclude_pattern().unwrap_or("-"));
    println!("  enabled:    {}", ganglia.enabled);
    println!("  interval:   {}s", config.metrics.polling_interval_secs);

    let endpoint = CollectorEndpoint::connect(&ganglia.host, ganglia.port, ganglia.multicast_ttl)?;
    println!("  resolved:   {}", endpoint.peer_addr());
    Ok(())
}

/// Lines describing one cycle over the bridge's own metrics.
fn dump(args: &DumpArgs) -> Result<Vec<String>, CliError> {
    let config = args.config.load()?;
    let settings = TaskSettings::from_config(&config.ganglia)?;

    let registry = Registry::new();
    ReporterMetrics::new()?.register(&registry)?;

    let mut lines = Vec::new();
    for sample in collect_samples(&registry.gather()) {
        if !settings.filter.allows(&sample.name) {
            lines.push(format!("# excluded {}", sample.name));
            continue;
        }
        for message in messages_for(&settings, &args.host_id, &sample) {
            let datagram = message.encode()?;
            lines.push(hex::encode(&datagram));
            if args.decode {
                lines.push(format!("  {:?}", GangliaMessage::decode(&datagram)?));
            }
        }
    }
    Ok(lines)
}
