//! Host metrics configuration shared with other reporters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Settings the host applies to every metrics reporter.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct HostMetricsConfig {
    /// Seconds between two forwarding cycles.
    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
}

fn default_polling_interval() -> u64 {
    10
}

impl Default for HostMetricsConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: default_polling_interval(),
        }
    }
}
