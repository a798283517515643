//! Prometheus metrics export.
//!
//! Subsystem crates register their counters in the default registry (behind
//! their own `metrics` feature). This module adds the process-level metrics
//! and renders everything in text exposition format.

use lazy_static::lazy_static;
use prometheus::{register_int_gauge_vec, Encoder, IntGaugeVec, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Constant 1, labelled with the service name
    pub static ref SERVICE_INFO: IntGaugeVec = register_int_gauge_vec!(
        "mq_relay_info",
        "Relay service information",
        &["service", "version"]
    )
    .expect("metric creation failed");

    /// Running inbound consumers and dispatchers
    pub static ref COMPONENTS_RUNNING: IntGaugeVec = register_int_gauge_vec!(
        "mq_relay_components_running",
        "Running relay components by kind",
        &["component"]
    )
    .expect("metric creation failed");
}

/// Publish the service info metric.
pub fn register_service(service_name: &str) {
    SERVICE_INFO
        .with_label_values(&[service_name, env!("CARGO_PKG_VERSION")])
        .set(1);
}

/// Set the number of running components of `kind` (`inbound`, `dispatcher`).
pub fn set_components_running(kind: &str, count: usize) {
    COMPONENTS_RUNNING
        .with_label_values(&[kind])
        .set(i64::try_from(count).unwrap_or(i64::MAX));
}

/// Encode all metrics of the default registry as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
