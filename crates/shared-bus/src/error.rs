//! # Broker Errors

use thiserror::Error;

/// Identifier of an open broker channel.
pub type ChannelId = u64;

/// Errors surfaced by broker operations.
///
/// Several of these are channel-fatal: the broker closes the channel that
/// issued the failing operation, and every later operation on that channel
/// fails with [`BrokerError::ChannelClosed`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The exchange does not exist (channel-fatal).
    #[error("Exchange not found: {exchange}")]
    ExchangeNotFound { exchange: String },

    /// The queue does not exist (channel-fatal).
    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    /// The delivery tag is unknown on this channel (channel-fatal).
    #[error("Unknown delivery tag {delivery_tag} on channel {channel_id}")]
    UnknownDeliveryTag {
        channel_id: ChannelId,
        delivery_tag: u64,
    },

    /// The channel was closed by an earlier failure or by `close()`.
    #[error("Channel {channel_id} is closed")]
    ChannelClosed { channel_id: ChannelId },

    /// Topology declaration conflicts with an existing declaration.
    #[error("Topology conflict: {0}")]
    TopologyConflict(String),

    /// The connection could not be established or was lost.
    #[error("Connection error: {0}")]
    Connection(String),
}

impl BrokerError {
    /// Returns true if the broker closes the channel when this error occurs.
    #[must_use]
    pub fn is_channel_fatal(&self) -> bool {
        matches!(
            self,
            BrokerError::ExchangeNotFound { .. }
                | BrokerError::QueueNotFound { .. }
                | BrokerError::UnknownDeliveryTag { .. }
                | BrokerError::ChannelClosed { .. }
        )
    }
}
