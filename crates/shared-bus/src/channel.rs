//! # Broker Ports
//!
//! The narrow interface the routing core uses to talk to a message broker.
//! Semantics follow AMQP 0-9-1 channels: a channel is the unit of failure,
//! and some failures (missing exchange, unknown delivery tag) close the
//! channel so that the NEXT operation on it fails instead of the one that
//! caused the problem.

use async_trait::async_trait;
use shared_types::Envelope;
use std::sync::Arc;

use crate::error::{BrokerError, ChannelId};

/// A message handed out by the broker, pending a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The message itself.
    pub envelope: Envelope,
    /// Channel-scoped tag used for ack/reject.
    pub delivery_tag: u64,
    /// Channel the delivery belongs to.
    pub channel_id: ChannelId,
    /// Queue the message was taken from.
    pub queue: String,
    /// True if the message was delivered before and returned to the queue.
    pub redelivered: bool,
    /// Number of times the message has been delivered, including this one.
    pub delivery_count: u32,
}

/// Factory of channels on one broker connection.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Open a fresh channel.
    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError>;
}

/// One broker channel.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Channel identifier.
    fn id(&self) -> ChannelId;

    /// Returns false once the channel was closed.
    fn is_open(&self) -> bool;

    /// Passive existence check of an exchange.
    ///
    /// A missing exchange closes the channel.
    async fn check_exchange(&self, exchange: &str) -> Result<(), BrokerError>;

    /// Publish `envelope` to `exchange` using `envelope.routing_key`.
    async fn publish(&self, exchange: &str, envelope: Envelope) -> Result<(), BrokerError>;

    /// Pull at most one message from `queue` without waiting.
    async fn get(&self, queue: &str) -> Result<Option<Delivery>, BrokerError>;

    /// Start a push subscription on `queue`.
    async fn consume(&self, queue: &str) -> Result<Box<dyn DeliveryStream>, BrokerError>;

    /// Acknowledge a delivery.
    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError>;

    /// Reject a delivery; `requeue = false` dead-letters (or drops) it.
    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), BrokerError>;

    /// Close the channel, returning unacknowledged deliveries to their queues.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Push subscription handle.
#[async_trait]
pub trait DeliveryStream: Send {
    /// Wait for the next delivery.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The next message
    /// - `None` - The consumer was cancelled (channel closed)
    async fn next_delivery(&mut self) -> Option<Delivery>;
}
