//! Recipient exchange resolution

use shared_bus::BrokerChannel;
use shared_types::topology;

use crate::error::{InboundError, InboundResult};

/// Derives the destination exchange of a recipient and confirms it exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct DestinationResolver;

impl DestinationResolver {
    /// Destination exchange name for a recipient. Pure string transform.
    #[must_use]
    pub fn exchange_for(recipient_id: &str) -> String {
        topology::recipient_exchange(recipient_id)
    }

    /// Resolve and check the destination exchange on `channel`.
    ///
    /// On failure the channel may already be closed by the broker.
    pub async fn resolve(channel: &dyn BrokerChannel, recipient_id: &str) -> InboundResult<String> {
        let exchange = Self::exchange_for(recipient_id);
        channel
            .check_exchange(&exchange)
            .await
            .map_err(|source| InboundError::InvalidExchange {
                exchange: exchange.clone(),
                source,
            })?;
        Ok(exchange)
    }
}
