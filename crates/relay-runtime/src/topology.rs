//! # Broker Topology
//!
//! Declares every exchange and queue the relay touches before any consumer
//! starts. Declarations are idempotent, so running this twice is harmless.
//!
//! ```text
//! {P}-INBOUND-EXCHANGE ─→ {P}-INBOUND-QUEUE ──(dlx)──→ {P}-INBOUND-EXCHANGE-DEAD ─→ {P}-INBOUND-QUEUE-DEAD
//! {R}-EXCHANGE ─→ {R}-QUEUE
//! {source} (topic) ─#─→ {consumer}.{source} ──(dlx)──→ {source}-DEAD ─→ {consumer}.{source}-DEAD
//! ```

use shared_bus::{BrokerError, ExchangeKind, InMemoryBroker, QueueOptions};
use shared_types::topology;
use tracing::debug;

use crate::config::RuntimeConfig;

/// Exchange receiving rejected messages of `source_id`.
#[must_use]
pub fn source_dead_exchange(source_id: &str) -> String {
    format!("{source_id}{}", topology::DEAD_SUFFIX)
}

/// Queue collecting rejected messages of `source_id` for `consumer_id`.
#[must_use]
pub fn source_dead_queue(consumer_id: &str, source_id: &str) -> String {
    format!(
        "{}{}",
        topology::source_queue(consumer_id, source_id),
        topology::DEAD_SUFFIX
    )
}

/// Declare the inbound topology of one partner.
pub fn declare_partner(broker: &InMemoryBroker, partner: &str) -> Result<(), BrokerError> {
    let exchange = topology::partner_inbound_exchange(partner);
    let dead_exchange = topology::partner_dead_exchange(partner);
    let queue = topology::partner_inbound_queue(partner);
    let dead_queue = topology::partner_dead_queue(partner);

    broker.declare_exchange(&exchange, ExchangeKind::Fanout)?;
    broker.declare_exchange(&dead_exchange, ExchangeKind::Fanout)?;
    broker.declare_queue(&queue, QueueOptions::with_dead_letter(&dead_exchange))?;
    broker.declare_queue(&dead_queue, QueueOptions::default())?;
    broker.bind_queue(&queue, &exchange, "")?;
    broker.bind_queue(&dead_queue, &dead_exchange, "")?;

    debug!(partner, queue = %queue, "Partner topology declared");
    Ok(())
}

/// Declare the exchange and queue of one recipient.
pub fn declare_recipient(broker: &InMemoryBroker, recipient: &str) -> Result<(), BrokerError> {
    let exchange = topology::recipient_exchange(recipient);
    let queue = topology::recipient_queue(recipient);

    broker.declare_exchange(&exchange, ExchangeKind::Fanout)?;
    broker.declare_queue(&queue, QueueOptions::default())?;
    broker.bind_queue(&queue, &exchange, "")?;

    debug!(recipient, exchange = %exchange, "Recipient topology declared");
    Ok(())
}

/// Declare the topic exchange of one internal source and the consumer's queue on it.
pub fn declare_source(
    broker: &InMemoryBroker,
    consumer_id: &str,
    source_id: &str,
) -> Result<(), BrokerError> {
    let dead_exchange = source_dead_exchange(source_id);
    let queue = topology::source_queue(consumer_id, source_id);
    let dead_queue = source_dead_queue(consumer_id, source_id);

    broker.declare_exchange(source_id, ExchangeKind::Topic)?;
    broker.declare_exchange(&dead_exchange, ExchangeKind::Fanout)?;
    broker.declare_queue(&queue, QueueOptions::with_dead_letter(&dead_exchange))?;
    broker.declare_queue(&dead_queue, QueueOptions::default())?;
    broker.bind_queue(&queue, source_id, "#")?;
    broker.bind_queue(&dead_queue, &dead_exchange, "")?;

    debug!(source_id, queue = %queue, "Source topology declared");
    Ok(())
}

/// Declare everything `config` refers to.
pub fn declare_topology(broker: &InMemoryBroker, config: &RuntimeConfig) -> Result<(), BrokerError> {
    for partner in &config.partners {
        declare_partner(broker, partner)?;
    }
    for recipient in &config.recipients {
        declare_recipient(broker, recipient)?;
    }
    for source in &config.sources {
        declare_source(broker, &config.consumer_id, source)?;
    }
    Ok(())
}
