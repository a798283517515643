//! # MQ Telemetry
//!
//! Logging and metrics bootstrap for the message relay.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, JSON in containers,
//!   pretty output in development
//! - **Metrics**: Prometheus default registry, rendered by [`encode_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mq_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MQ_SERVICE_NAME` | `mq-relay` | Service name in logs and metrics |
//! | `MQ_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `MQ_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `MQ_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{encode_metrics, register_service, set_components_running};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and process metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(config)?;
    register_service(&config.service_name);

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Guard that keeps telemetry active. Logs shutdown when dropped.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}
