//! # Runtime Configuration
//!
//! Everything the relay needs is read from `MQ_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MQ_BROKER_URI` | `memory://local` |
//! | `MQ_PARTNERS` | `VAKT` |
//! | `MQ_RECIPIENTS` | (none) |
//! | `MQ_CONSUMER_ID` | `relay` |
//! | `MQ_SOURCES` | `komgo-internal` |
//! | `MQ_POLLING_INTERVAL_MS` | `1000` |
//! | `MQ_MAX_ATTEMPTS` | (unbounded) |
//! | `MQ_RETRY_BACKOFF_MS` | `0` |
//! | `MQ_RETRY_BACKOFF_MAX_MS` | `30000` |
//! | `MQ_RECONNECT_DELAY_MS` | `500` |
//! | `MQ_AUDIT_KEYS` | (none) |

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use mq_02_event_dispatcher::RetryPolicy;
use mq_telemetry::TelemetryConfig;
use shared_bus::MEMORY_SCHEME;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric variable does not parse.
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    /// Only the in-process broker is served.
    #[error("Unsupported broker URI {0:?}: only memory:// is supported")]
    UnsupportedBrokerUri(String),

    /// A value that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A name list contains the same entry twice.
    #[error("{var} lists {name} more than once")]
    Duplicate { var: &'static str, name: String },

    /// An identifier is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Backoff base exceeds its cap.
    #[error("MQ_RETRY_BACKOFF_MS must not exceed MQ_RETRY_BACKOFF_MAX_MS")]
    BackoffRange,
}

/// Complete relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Broker connection URI.
    pub broker_uri: String,
    /// External partners, one inbound router each.
    pub partners: Vec<String>,
    /// Recipients whose exchanges are declared at startup.
    pub recipients: Vec<String>,
    /// Dispatcher consumer identifier.
    pub consumer_id: String,
    /// Dispatcher source identifiers, polled in this order.
    pub sources: Vec<String>,
    /// Dispatcher tick.
    pub polling_interval: Duration,
    /// Transient failure handling.
    pub retry: RetryPolicy,
    /// Delay before an inbound channel is re-created.
    pub reconnect_delay: Duration,
    /// Keys claimed by the built-in audit handler.
    pub audit_keys: Vec<String>,
    /// Logging and metrics.
    pub telemetry: TelemetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broker_uri: "memory://local".to_string(),
            partners: vec!["VAKT".to_string()],
            recipients: Vec::new(),
            consumer_id: "relay".to_string(),
            sources: vec!["komgo-internal".to_string()],
            polling_interval: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
            reconnect_delay: Duration::from_millis(500),
            audit_keys: Vec::new(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source and validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            broker_uri: lookup("MQ_BROKER_URI").unwrap_or(defaults.broker_uri),
            partners: lookup("MQ_PARTNERS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.partners),
            recipients: lookup("MQ_RECIPIENTS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.recipients),
            consumer_id: lookup("MQ_CONSUMER_ID").unwrap_or(defaults.consumer_id),
            sources: lookup("MQ_SOURCES")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.sources),
            polling_interval: parse_millis(&lookup, "MQ_POLLING_INTERVAL_MS")?
                .unwrap_or(defaults.polling_interval),
            retry: RetryPolicy {
                max_attempts: parse_number(&lookup, "MQ_MAX_ATTEMPTS")?
                    .map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
                base_backoff: parse_millis(&lookup, "MQ_RETRY_BACKOFF_MS")?
                    .unwrap_or(defaults.retry.base_backoff),
                max_backoff: parse_millis(&lookup, "MQ_RETRY_BACKOFF_MAX_MS")?
                    .unwrap_or(defaults.retry.max_backoff),
            },
            reconnect_delay: parse_millis(&lookup, "MQ_RECONNECT_DELAY_MS")?
                .unwrap_or(defaults.reconnect_delay),
            audit_keys: lookup("MQ_AUDIT_KEYS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.audit_keys),
            telemetry: TelemetryConfig::from_lookup(&lookup),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the runtime relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.broker_uri.starts_with(MEMORY_SCHEME) {
            return Err(ConfigError::UnsupportedBrokerUri(self.broker_uri.clone()));
        }
        if self.consumer_id.trim().is_empty() {
            return Err(ConfigError::Empty("MQ_CONSUMER_ID"));
        }
        if self.polling_interval.is_zero() {
            return Err(ConfigError::Zero("MQ_POLLING_INTERVAL_MS"));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::Zero("MQ_MAX_ATTEMPTS"));
        }
        if self.retry.base_backoff > self.retry.max_backoff {
            return Err(ConfigError::BackoffRange);
        }
        check_unique("MQ_PARTNERS", &self.partners)?;
        check_unique("MQ_RECIPIENTS", &self.recipients)?;
        check_unique("MQ_SOURCES", &self.sources)?;
        Ok(())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

fn parse_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_number(lookup, var)?.map(Duration::from_millis))
}

fn check_unique(var: &'static str, names: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::Duplicate {
                var,
                name: name.clone(),
            });
        }
    }
    Ok(())
}
