//! # Event Dispatcher Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `mq_dispatch_messages_received_total{source}` - Messages pulled
//! - `mq_dispatch_messages_processed_total{source, outcome}` - Verdicts (`ack`, `reject`, `requeue`)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Messages pulled per source
    pub static ref MESSAGES_RECEIVED: IntCounterVec = register_int_counter_vec!(
        "mq_dispatch_messages_received_total",
        "Messages pulled from polling sources",
        &["source"]
    )
    .expect("Failed to create MESSAGES_RECEIVED metric");

    /// Verdicts per source
    pub static ref MESSAGES_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "mq_dispatch_messages_processed_total",
        "Messages settled, by verdict",
        &["source", "outcome"]
    )
    .expect("Failed to create MESSAGES_PROCESSED metric");
}

#[cfg(feature = "metrics")]
pub fn record_received(source: &str) {
    MESSAGES_RECEIVED.with_label_values(&[source]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_processed(source: &str, outcome: &str) {
    MESSAGES_PROCESSED.with_label_values(&[source, outcome]).inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_received(_source: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_processed(_source: &str, _outcome: &str) {}
