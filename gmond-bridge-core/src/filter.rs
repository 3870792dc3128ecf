//! Exclusion filter applied to sample names before they are forwarded.

use regex::Regex;

use crate::error::ReporterError;

/// Decides which samples are forwarded.
#[derive(Debug, Clone, Default)]
pub enum MetricFilter {
    /// Forward everything.
    #[default]
    All,
    /// Skip samples whose whole name matches the pattern.
    Exclude { pattern: String, regex: Regex },
}

impl MetricFilter {
    pub fn exclude(pattern: &str) -> Result<Self, ReporterError> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(MetricFilter::Exclude {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// `All` when no pattern is configured.
    pub fn from_pattern(pattern: Option<&str>) -> Result<Self, ReporterError> {
        match pattern {
            Some(p) => Self::exclude(p),
            None => Ok(MetricFilter::All),
        }
    }

    /// Whether a sample with this name should be forwarded.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            MetricFilter::All => true,
            MetricFilter::Exclude { regex, .. } => !regex.is_match(name),
        }
    }

    /// The pattern as configured, unanchored.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            MetricFilter::All => None,
            MetricFilter::Exclude { pattern, .. } => Some(pattern),
        }
    }
}
