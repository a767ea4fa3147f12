//! Harness configuration
//!
//! Defaults match the behavior hosts expect out of the box; environment variables and CLI flags override them.

use std::env;
use std::time::Duration;

use casework_core::DEFAULT_POLL_INTERVAL;
use casework_core::measure::DEFAULT_ITERATIONS;
use thiserror::Error;

pub const ENV_POLL_INTERVAL_MS: &str = "CASEWORK_POLL_INTERVAL_MS";
pub const ENV_MEASURE_ITERATIONS: &str = "CASEWORK_MEASURE_ITERATIONS";
pub const ENV_STRICT_EXIT: &str = "CASEWORK_STRICT_EXIT";
pub const ENV_QUIET: &str = "CASEWORK_QUIET";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a whole number, got {value:?}")]
    NotANumber { var: &'static str, value: String },

    #[error("{var}: expected a boolean (1/0, true/false, yes/no), got {value:?}")]
    NotABool { var: &'static str, value: String },

    #[error("{var}: must be greater than zero")]
    Zero { var: &'static str },
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Time handed to the run loop between expectation checks
    pub poll_interval: Duration,
    /// Runs per `measure` call
    pub measure_iterations: usize,
    /// Exit non-zero from `run_all_and_exit` when any failure was reported
    pub strict_exit: bool,
    /// Suppress progress narration
    pub quiet: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            measure_iterations: DEFAULT_ITERATIONS,
            strict_exit: false,
            quiet: false,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the `CASEWORK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `CASEWORK_*` variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval = Duration::from_millis(parse_positive(ENV_POLL_INTERVAL_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_MEASURE_ITERATIONS) {
            config.measure_iterations = parse_positive(ENV_MEASURE_ITERATIONS, &value)? as usize;
        }
        if let Some(value) = lookup(ENV_STRICT_EXIT) {
            config.strict_exit = parse_bool(ENV_STRICT_EXIT, &value)?;
        }
        if let Some(value) = lookup(ENV_QUIET) {
            config.quiet = parse_bool(ENV_QUIET, &value)?;
        }
        Ok(config)
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the number of runs per `measure`
    pub fn with_measure_iterations(mut self, iterations: usize) -> Self {
        self.measure_iterations = iterations;
        self
    }

    pub fn with_strict_exit(mut self, strict: bool) -> Self {
        self.strict_exit = strict;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let parsed: u64 = value.trim().parse().map_err(|_| ConfigError::NotANumber {
        var,
        value: value.to_string(),
    })?;
    if parsed == 0 {
        return Err(ConfigError::Zero { var });
    }
    Ok(parsed)
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::NotABool {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.measure_iterations, 10);
        assert!(!config.strict_exit);
        assert!(!config.quiet);
    }

    #[test]
    fn test_no_variables_means_defaults() {
        assert_eq!(HarnessConfig::from_lookup(lookup(&[])), Ok(HarnessConfig::default()));
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (ENV_POLL_INTERVAL_MS, "25"),
            (ENV_MEASURE_ITERATIONS, " 3 "),
            (ENV_STRICT_EXIT, "yes"),
            (ENV_QUIET, "1"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(25));
        assert_eq!(config.measure_iterations, 3);
        assert!(config.strict_exit);
        assert!(config.quiet);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert_eq!(
            HarnessConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL_MS, "fast")])),
            Err(ConfigError::NotANumber {
                var: ENV_POLL_INTERVAL_MS,
                value: "fast".to_string()
            })
        );
        assert_eq!(
            HarnessConfig::from_lookup(lookup(&[(ENV_MEASURE_ITERATIONS, "0")])),
            Err(ConfigError::Zero {
                var: ENV_MEASURE_ITERATIONS
            })
        );
        let err = HarnessConfig::from_lookup(lookup(&[(ENV_STRICT_EXIT, "maybe")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CASEWORK_STRICT_EXIT: expected a boolean (1/0, true/false, yes/no), got \"maybe\""
        );
    }

    #[test]
    fn test_builders() {
        let config = HarnessConfig::new()
            .with_poll_interval(Duration::from_millis(1))
            .with_measure_iterations(2)
            .with_strict_exit(true)
            .with_quiet(true);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.measure_iterations, 2);
        assert!(config.strict_exit && config.quiet);
    }
}
