//! # gmond-bridge Configuration
//!
//! Layered configuration for the Ganglia bridge.
//!
//! ## Sources
//! - **Defaults**: every field has one, so an empty source is a valid config
//! - **YAML files**: `config/gmond-bridge.yaml` and an environment overlay
//! - **Environment**: `GMOND_BRIDGE_*` variables, `__` separating sections
//! - **Host properties**: flat `ganglia.metrics.*` maps handed over by a host

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod ganglia;
mod metrics;
mod properties;
mod validation;

pub use error::ConfigError;
pub use ganglia::{GangliaConfig, DEFAULT_GROUP, DEFAULT_HOST, DEFAULT_PORT};
pub use metrics::HostMetricsConfig;
pub use properties::{Properties, GANGLIA_KEY_PREFIX, POLLING_INTERVAL_KEY};

/// Default location of the base configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/gmond-bridge.yaml";

const ENV_PREFIX: &str = "GMOND_BRIDGE_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Collector endpoint and forwarding settings.
    #[validate(nested)]
    #[serde(default)]
    pub ganglia: GangliaConfig,

    /// Settings shared with the host's other metrics reporters.
    #[validate(nested)]
    #[serde(default)]
    pub metrics: HostMetricsConfig,
}

impl BridgeConfig {
    /// Figment holding the default file/env hierarchy, before extraction.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/gmond-bridge.yaml`, if present
    /// 3. `config/<GMOND_BRIDGE_ENV>.yaml`, if present (default `production`)
    /// 4. `GMOND_BRIDGE_*` environment variables
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(BridgeConfig::default()));

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        } else {
            tracing::debug!(
                path = DEFAULT_CONFIG_PATH,
                "configuration file not found, using defaults"
            );
        }

        let env = std::env::var("GMOND_BRIDGE_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Figment for one explicit file plus environment overrides.
    pub fn figment_from_path<P: AsRef<Path>>(path: P) -> Result<Figment, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Ok(Figment::from(Serialized::defaults(BridgeConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from the default files and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::extract(Self::figment_from_path(path)?)
    }

    /// Build configuration from host properties on top of the defaults.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        let overrides = properties.to_dict()?;
        Self::extract(
            Figment::from(Serialized::defaults(BridgeConfig::default()))
                .merge(Serialized::defaults(overrides)),
        )
    }

    /// Extract and validate.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
