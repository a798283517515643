//! Inbound Router - Core routing logic
//!
//! One router per external partner. `route` is called once per delivery on
//! the partner's inbound queue and never returns an error: every failure is
//! logged, classified and turned into a [`RouteOutcome`].

use shared_bus::{BrokerChannel, Delivery};
use tracing::{debug, error, info, warn};

use crate::domain::{DestinationResolver, FaultMemory, Forwarder, HeaderValidator};
use crate::error::InboundError;
use crate::metrics;

/// Result of routing one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The broker cancelled the consumer. Nothing settled.
    Cancelled,
    /// Rejected because the previous message left a fault behind.
    DrainedAfterFault,
    /// Rejected because a routing header is missing.
    InvalidHeaders,
    /// The destination could not be confirmed. Fault memory armed, nothing settled.
    ResolutionFailed,
    /// Forwarding failed. Nothing settled.
    PublishFailed,
    /// Forwarded to `exchange` and acked.
    Routed { exchange: String },
    /// The ack or reject call itself failed.
    SettleFailed,
}

impl RouteOutcome {
    /// Returns true if the broker accepted the router's ack or reject.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            RouteOutcome::DrainedAfterFault
                | RouteOutcome::InvalidHeaders
                | RouteOutcome::Routed { .. }
        )
    }
}

/// Routes messages from one partner inbound queue to recipient exchanges.
#[derive(Debug)]
pub struct InboundRouter {
    partner: String,
    forwarder: Forwarder,
    fault_memory: FaultMemory,
}

impl InboundRouter {
    /// Router for `partner` (e.g. `VAKT`).
    #[must_use]
    pub fn new(partner: impl Into<String>) -> Self {
        let partner = partner.into();
        Self {
            forwarder: Forwarder::new(&partner),
            partner,
            fault_memory: FaultMemory::new(),
        }
    }

    /// Partner this router serves.
    #[must_use]
    pub fn partner(&self) -> &str {
        &self.partner
    }

    /// Current fault memory.
    #[must_use]
    pub fn fault_memory(&self) -> &FaultMemory {
        &self.fault_memory
    }

    /// Route one delivery received on `channel`.
    ///
    /// `None` means the broker cancelled the consumer.
    pub async fn route(
        &mut self,
        channel: &dyn BrokerChannel,
        delivery: Option<Delivery>,
    ) -> RouteOutcome {
        let Some(delivery) = delivery else {
            warn!(partner = %self.partner, "Consumer cancelled by broker");
            return RouteOutcome::Cancelled;
        };
        let message_id = delivery.envelope.message_id_or_unknown().to_string();

        if self.fault_memory.take() {
            info!(
                partner = %self.partner,
                message_id = %message_id,
                redelivered = delivery.redelivered,
                "Rejecting message received after a faulty one"
            );
            return self
                .reject(channel, &delivery, RouteOutcome::DrainedAfterFault)
                .await;
        }

        let headers = match HeaderValidator::validate(&delivery.envelope) {
            Ok(headers) => headers,
            Err(e) => {
                self.log_error(&e, &message_id);
                return self
                    .reject(channel, &delivery, RouteOutcome::InvalidHeaders)
                    .await;
            }
        };

        let exchange = match DestinationResolver::resolve(channel, &headers.recipient_id).await {
            Ok(exchange) => exchange,
            Err(e) => {
                // Channel may be gone; the next delivery settles this one.
                self.fault_memory.arm();
                metrics::record_fault(&self.partner);
                self.log_error(&e, &message_id);
                return RouteOutcome::ResolutionFailed;
            }
        };

        if let Err(e) = self
            .forwarder
            .forward(channel, &exchange, &delivery.envelope)
            .await
        {
            self.log_error(&e, &message_id);
            return RouteOutcome::PublishFailed;
        }

        if let Err(e) = channel.ack(&delivery).await {
            self.log_error(&InboundError::Settle(e), &message_id);
            return RouteOutcome::SettleFailed;
        }

        metrics::record_routed(&self.partner, true);
        info!(
            partner = %self.partner,
            message_id = %message_id,
            sender_id = %headers.sender_id,
            recipient_id = %headers.recipient_id,
            exchange = %exchange,
            platform = %self.forwarder.platform(),
            "Message routed"
        );
        RouteOutcome::Routed { exchange }
    }

    /// Reject without requeue and report `outcome`.
    async fn reject(
        &self,
        channel: &dyn BrokerChannel,
        delivery: &Delivery,
        outcome: RouteOutcome,
    ) -> RouteOutcome {
        let message_id = delivery.envelope.message_id_or_unknown();
        metrics::record_routed(&self.partner, false);
        match channel.reject(delivery, false).await {
            Ok(()) => {
                debug!(partner = %self.partner, message_id = %message_id, outcome = ?outcome, "Message rejected");
                outcome
            }
            Err(e) => {
                self.log_error(&InboundError::Settle(e), message_id);
                RouteOutcome::SettleFailed
            }
        }
    }

    fn log_error(&self, e: &InboundError, message_id: &str) {
        error!(
            error_code = %e.code(),
            error_name = %e.name(),
            partner = %self.partner,
            message_id = %message_id,
            error = %e,
            "Inbound routing failed"
        );
    }
}
