//! Forwarder
//!
//! Publishes a validated message to its recipient exchange with provenance.

use shared_bus::BrokerChannel;
use shared_types::{topology, Envelope, INTERNAL_ROUTING_KEY, SENDER_PLATFORM_HEADER};

use crate::error::{InboundError, InboundResult};

/// Publishes inbound messages to internal recipient exchanges.
#[derive(Debug, Clone)]
pub struct Forwarder {
    platform: String,
}

impl Forwarder {
    /// Forwarder for messages coming from `source_party`.
    #[must_use]
    pub fn new(source_party: &str) -> Self {
        Self {
            platform: topology::platform_name(source_party),
        }
    }

    /// Value injected as `sender-platform`.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Build the forwarded envelope.
    ///
    /// Headers are the original headers plus `sender-platform`; the routing
    /// key is always the internal one; payload and message id are kept.
    #[must_use]
    pub fn prepare(&self, original: &Envelope) -> Envelope {
        let mut headers = original.headers.clone();
        headers.insert(SENDER_PLATFORM_HEADER.to_string(), self.platform.clone());

        Envelope {
            headers,
            routing_key: INTERNAL_ROUTING_KEY.to_string(),
            payload: original.payload.clone(),
            message_id: original.message_id.clone(),
        }
    }

    /// Publish `original` to `exchange`.
    pub async fn forward(
        &self,
        channel: &dyn BrokerChannel,
        exchange: &str,
        original: &Envelope,
    ) -> InboundResult<()> {
        channel
            .publish(exchange, self.prepare(original))
            .await
            .map_err(|source| InboundError::PublishFailed {
                exchange: exchange.to_string(),
                source,
            })
    }
}
