//! # Inbound Router Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! mq-01-inbound-router = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `mq_inbound_messages_total{partner, routed}` - Messages routed (`true`) or rejected (`false`)
//! - `mq_inbound_faults_total{partner}` - Resolution failures that armed fault memory

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Inbound messages by partner and routing result
    pub static ref INBOUND_MESSAGES: IntCounterVec = register_int_counter_vec!(
        "mq_inbound_messages_total",
        "Inbound messages by routing result",
        &["partner", "routed"]
    )
    .expect("Failed to create INBOUND_MESSAGES metric");

    /// Resolution failures by partner
    pub static ref INBOUND_FAULTS: IntCounterVec = register_int_counter_vec!(
        "mq_inbound_faults_total",
        "Resolution failures that armed fault memory",
        &["partner"]
    )
    .expect("Failed to create INBOUND_FAULTS metric");
}

/// Record a routed (`true`) or rejected (`false`) message
#[cfg(feature = "metrics")]
pub fn record_routed(partner: &str, routed: bool) {
    let routed = if routed { "true" } else { "false" };
    INBOUND_MESSAGES.with_label_values(&[partner, routed]).inc();
}

/// Record a resolution failure
#[cfg(feature = "metrics")]
pub fn record_fault(partner: &str) {
    INBOUND_FAULTS.with_label_values(&[partner]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_routed(_partner: &str, _routed: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn record_fault(_partner: &str) {}
