//! # Broker Topology Naming
//!
//! Naming conventions for exchanges and queues. Provisioning the topology is
//! NOT the core's job; these functions only make sure every component derives
//! the same names from the same identifiers.
//!
//! ```text
//! {PARTNER}-INBOUND-EXCHANGE ──→ {PARTNER}-INBOUND-QUEUE
//!            (dead-letter)  ──→ {PARTNER}-INBOUND-EXCHANGE-DEAD ──→ {PARTNER}-INBOUND-QUEUE-DEAD
//!
//! {RECIPIENT}-EXCHANGE ──→ {RECIPIENT}-QUEUE
//! ```

/// Suffix of a recipient's exchange.
pub const EXCHANGE_SUFFIX: &str = "-EXCHANGE";

/// Suffix of a recipient's queue.
pub const QUEUE_SUFFIX: &str = "-QUEUE";

/// Suffix appended to dead-letter exchanges and queues.
pub const DEAD_SUFFIX: &str = "-DEAD";

/// Exchange that external partner `partner` publishes into.
#[must_use]
pub fn partner_inbound_exchange(partner: &str) -> String {
    format!("{partner}-INBOUND{EXCHANGE_SUFFIX}")
}

/// Queue the inbound router consumes for `partner`.
#[must_use]
pub fn partner_inbound_queue(partner: &str) -> String {
    format!("{partner}-INBOUND{QUEUE_SUFFIX}")
}

/// Dead-letter exchange of the partner inbound queue.
#[must_use]
pub fn partner_dead_exchange(partner: &str) -> String {
    format!("{}{DEAD_SUFFIX}", partner_inbound_exchange(partner))
}

/// Dead-letter queue of the partner inbound queue.
#[must_use]
pub fn partner_dead_queue(partner: &str) -> String {
    format!("{}{DEAD_SUFFIX}", partner_inbound_queue(partner))
}

/// Destination exchange of `recipient_id`. Pure string transform.
#[must_use]
pub fn recipient_exchange(recipient_id: &str) -> String {
    format!("{recipient_id}{EXCHANGE_SUFFIX}")
}

/// Queue bound to the recipient exchange.
#[must_use]
pub fn recipient_queue(recipient_id: &str) -> String {
    format!("{recipient_id}{QUEUE_SUFFIX}")
}

/// Queue a polling consumer reads for a logical source.
#[must_use]
pub fn source_queue(consumer_id: &str, source_id: &str) -> String {
    format!("{consumer_id}.{source_id}")
}

/// Value of the `sender-platform` header for a partner (lowercase name).
#[must_use]
pub fn platform_name(partner: &str) -> String {
    partner.to_lowercase()
}
