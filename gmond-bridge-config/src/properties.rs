//! Flat host property maps as a configuration source.
//!
//! Host applications hand plugins their settings as `key=value` strings
//! (`ganglia.metrics.port=8649`), often under a namespace of their own
//! (`kafka.ganglia.metrics.port`). [`Properties`] maps the keys this bridge
//! understands onto [`crate::BridgeConfig`] fields and can be merged into any
//! figment like another provider.

use std::collections::BTreeMap;

use figment::value::{Dict, Map, Tag, Value};
use figment::{Metadata, Profile, Provider};

use crate::ConfigError;

/// Prefix shared by every Ganglia reporter key.
pub const GANGLIA_KEY_PREFIX: &str = "ganglia.metrics.";

/// Polling interval key owned by the host's shared metrics settings.
pub const POLLING_INTERVAL_KEY: &str = "metrics.polling.interval.secs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Integer,
    Flag,
}

/// Property key, config path (`section.field`) and expected value type.
const PROPERTY_KEYS: &[(&str, &str, Kind)] = &[
    ("ganglia.metrics.host", "ganglia.host", Kind::Text),
    ("ganglia.metrics.port", "ganglia.port", Kind::Integer),
    ("ganglia.metrics.group", "ganglia.group", Kind::Text),
    ("ganglia.metrics.exclude.regex", "ganglia.exclude_regex", Kind::Text),
    ("ganglia.metrics.reporter.enabled", "ganglia.enabled", Kind::Flag),
    ("ganglia.metrics.spoof", "ganglia.spoof", Kind::Text),
    ("ganglia.metrics.tmax", "ganglia.tmax", Kind::Integer),
    ("ganglia.metrics.dmax", "ganglia.dmax", Kind::Integer),
    ("ganglia.metrics.multicast.ttl", "ganglia.multicast_ttl", Kind::Integer),
    (POLLING_INTERVAL_KEY, "metrics.polling_interval_secs", Kind::Integer),
];

/// String properties supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
    namespace: Option<String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look keys up under `<namespace>.` (e.g. `kafka` for `kafka.ganglia.metrics.host`).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = namespace.trim_end_matches('.');
        self.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
        self
    }

    /// Parses `key=value` pairs, as given on a command line.
    pub fn parse_pair(pair: &str) -> Result<(String, String), String> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(format!("expected key=value, got `{}`", pair)),
        }
    }

    /// Raw value for an un-namespaced key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match &self.namespace {
            Some(ns) => self.entries.get(&format!("{}.{}", ns, key)),
            None => self.entries.get(key),
        };
        value.map(String::as_str)
    }

    /// Typed, nested overrides for every recognised key that is present.
    pub fn to_dict(&self) -> Result<Dict, ConfigError> {
        let mut sections: BTreeMap<&str, Dict> = BTreeMap::new();
        for (key, path, kind) in PROPERTY_KEYS {
            let Some(raw) = self.get(key) else {
                continue;
            };
            let (section, field) = path.split_once('.').unwrap_or(("", path));
            let value = typed_value(key, raw, *kind)?;
            sections
                .entry(section)
                .or_default()
                .insert(field.to_string(), value);
        }

        Ok(sections
            .into_iter()
            .map(|(section, dict)| (section.to_string(), Value::Dict(Tag::Default, dict)))
            .collect())
    }
}

fn typed_value(key: &str, raw: &str, kind: Kind) -> Result<Value, ConfigError> {
    let raw = raw.trim();
    let invalid = |expected| ConfigError::InvalidProperty {
        key: key.to_string(),
        value: raw.to_string(),
        expected,
    };
    match kind {
        Kind::Text => Ok(Value::from(raw.to_string())),
        Kind::Integer => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("a non-negative integer")),
        Kind::Flag => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::from(true)),
            "false" => Ok(Value::from(false)),
            _ => Err(invalid("true or false")),
        },
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            namespace: None,
        }
    }
}

impl Provider for Properties {
    fn metadata(&self) -> Metadata {
        Metadata::named("host properties")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let dict = self
            .to_dict()
            .map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(Profile::Default.collect(dict))
    }
}
