// gmond-bridge-config/src/validation.rs
//! Custom validation functions for configuration.

use regex::Regex;
use validator::ValidationError;

/// Validate that a collector host is non-empty and free of whitespace.
pub fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() || host.len() > 253 || host.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("invalid_host"));
    }
    Ok(())
}

/// Validate a metric group. gmond uses it verbatim in names and XML, so no
/// whitespace or markup characters.
pub fn validate_group(group: &str) -> Result<(), ValidationError> {
    let re = Regex::new("^[A-Za-z0-9_.-]+$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(group) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_group"))
    }
}

/// Validate that an exclusion pattern compiles.
pub fn validate_regex(pattern: &str) -> Result<(), ValidationError> {
    match Regex::new(pattern) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_exclude_regex")),
    }
}

/// Validate a spoof value of the form `ip:hostname`.
pub fn validate_spoof(spoof: &str) -> Result<(), ValidationError> {
    match spoof.split_once(':') {
        Some((ip, host)) if !ip.is_empty() && !host.is_empty() => Ok(()),
        _ => Err(ValidationError::new("invalid_spoof")),
    }
}
