//! Flattens gathered prometheus metric families into gmond samples.
//!
//! gmond only knows scalar metrics, so every labelled series becomes its own
//! name (label values appended with dots) and histograms/summaries expand into
//! several scalars.

use gmond_bridge_protocol::Slope;
use prometheus::proto::{Metric, MetricFamily, MetricType};

/// One scalar ready to be announced to gmond.
#[derive(Debug, Clone, PartialEq)]
pub struct GangliaSample {
    /// Name without the group prefix.
    pub name: String,
    pub value: f64,
    pub slope: Slope,
    pub units: &'static str,
    pub description: String,
}

/// Samples for every family, in gather order. Non-finite values are dropped.
pub fn collect_samples(families: &[MetricFamily]) -> Vec<GangliaSample> {
    let mut samples = Vec::new();
    for family in families {
        let units = units_for(family.get_name());
        for metric in family.get_metric() {
            let base = series_name(family.get_name(), metric);
            let mut push = |name: String, value: f64, slope: Slope| {
                if value.is_finite() {
                    samples.push(GangliaSample {
                        name,
                        value,
                        slope,
                        units,
                        description: family.get_help().to_string(),
                    });
                }
            };

            match family.get_field_type() {
                MetricType::COUNTER => push(base, metric.get_counter().get_value(), Slope::Positive),
                MetricType::GAUGE => push(base, metric.get_gauge().get_value(), Slope::Both),
                MetricType::UNTYPED => push(base, metric.get_untyped().get_value(), Slope::Both),
                MetricType::HISTOGRAM => {
                    let histogram = metric.get_histogram();
                    let count = histogram.get_sample_count();
                    let sum = histogram.get_sample_sum();
                    push(format!("{}.count", base), count as f64, Slope::Positive);
                    push(format!("{}.sum", base), sum, Slope::Both);
                    if count > 0 {
                        push(format!("{}.mean", base), sum / count as f64, Slope::Both);
                    }
                }
                MetricType::SUMMARY => {
                    let summary = metric.get_summary();
                    push(
                        format!("{}.count", base),
                        summary.get_sample_count() as f64,
                        Slope::Positive,
                    );
                    push(format!("{}.sum", base), summary.get_sample_sum(), Slope::Both);
                    for quantile in summary.get_quantile() {
                        push(
                            format!("{}.{}", base, quantile_suffix(quantile.get_quantile())),
                            quantile.get_value(),
                            Slope::Both,
                        );
                    }
                }
            }
        }
    }
    samples
}

/// Family name followed by the series' label values.
fn series_name(family: &str, metric: &Metric) -> String {
    let mut name = family.to_string();
    for label in metric.get_label() {
        name.push('.');
        name.extend(label.get_value().chars().map(sanitize));
    }
    name
}

fn sanitize(c: char) -> char {
    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
        c
    } else {
        '_'
    }
}

/// `0.5` -> `p50`, `0.999` -> `p99_9`.
fn quantile_suffix(quantile: f64) -> String {
    let percent = format!("{}", (quantile * 1000.0).round() / 10.0);
    format!("p{}", percent.replace('.', "_"))
}

/// Units implied by prometheus naming conventions.
fn units_for(name: &str) -> &'static str {
    let name = name.strip_suffix("_total").unwrap_or(name);
    if name.ends_with("_seconds") {
        "seconds"
    } else if name.ends_with("_bytes") {
        "bytes"
    } else if name.ends_with("_ratio") {
        "ratio"
    } else {
        ""
    }
}
