//! Ganglia collector and reporter configuration.
//!
//! Describes where samples go (the gmond endpoint), how they are labelled
//! (group prefix, optional spoofed host) and which ones are left out.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8649;
pub const DEFAULT_GROUP: &str = "gmond_bridge";

/// Ganglia reporter configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct GangliaConfig {
    /// Collector (gmond) hostname or address.
    #[validate(custom(function = validation::validate_host))]
    #[serde(default = "default_host")]
    pub host: String,

    /// Collector UDP port.
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Metric group, also used as the metric name prefix.
    #[validate(length(min = 1, max = 128))]
    #[validate(custom(function = validation::validate_group))]
    #[serde(default = "default_group")]
    pub group: String,

    /// Metrics whose names fully match this pattern are not forwarded.
    #[validate(custom(function = validation::validate_regex))]
    #[serde(default)]
    pub exclude_regex: Option<String>,

    /// Start forwarding as soon as the reporter is initialized.
    #[serde(default)]
    pub enabled: bool,

    /// `ip:hostname` to report metrics as, instead of the sender address.
    #[validate(custom(function = validation::validate_spoof))]
    #[serde(default)]
    pub spoof: Option<String>,

    /// Maximum seconds gmond should expect between updates.
    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_tmax")]
    pub tmax: u32,

    /// Seconds after which gmond forgets a silent metric (0 = never).
    #[serde(default)]
    pub dmax: u32,

    /// TTL applied when the collector address is a multicast group.
    #[validate(range(min = 1, max = 255))]
    #[serde(default = "default_multicast_ttl")]
    pub multicast_ttl: u32,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_group() -> String {
    DEFAULT_GROUP.into()
}

fn default_tmax() -> u32 {
    60
}

fn default_multicast_ttl() -> u32 {
    1
}

impl Default for GangliaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            group: default_group(),
            exclude_regex: None,
            enabled: false,
            spoof: None,
            tmax: default_tmax(),
            dmax: 0,
            multicast_ttl: default_multicast_ttl(),
        }
    }
}

impl GangliaConfig {
    /// The exclusion pattern, treating an empty string as unset.
    pub fn exclude_pattern(&self) -> Option<&str> {
        self.exclude_regex.as_deref().filter(|p| !p.is_empty())
    }

    /// `host:port` as shown in logs and status.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
