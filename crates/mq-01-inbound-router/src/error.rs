//! Error types for the Inbound Router subsystem

use shared_bus::BrokerError;
use shared_types::{ErrorCode, ErrorName};
use thiserror::Error;

/// Inbound router errors
#[derive(Debug, Error)]
pub enum InboundError {
    /// A mandatory routing header is missing or empty
    #[error("Message headers are invalid: missing {missing}")]
    InvalidHeaders { missing: &'static str },

    /// The recipient exchange could not be confirmed
    #[error("Recipient exchange {exchange} is invalid: {source}")]
    InvalidExchange {
        exchange: String,
        #[source]
        source: BrokerError,
    },

    /// Forwarding to the recipient exchange failed
    #[error("Failed to publish to {exchange}: {source}")]
    PublishFailed {
        exchange: String,
        #[source]
        source: BrokerError,
    },

    /// Ack or reject of the source message failed
    #[error("Failed to settle source message: {0}")]
    Settle(#[source] BrokerError),

    /// The consumer task ended abnormally
    #[error("Consumer task failed: {0}")]
    TaskFailed(String),
}

impl InboundError {
    /// Log category of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            InboundError::InvalidHeaders { .. } | InboundError::InvalidExchange { .. } => {
                ErrorCode::ValidationExternalInboundAmqp
            }
            InboundError::PublishFailed { .. }
            | InboundError::Settle(_)
            | InboundError::TaskFailed(_) => ErrorCode::ConnectionInternalMq,
        }
    }

    /// Log name of this error.
    #[must_use]
    pub fn name(&self) -> ErrorName {
        match self {
            InboundError::InvalidHeaders { .. } => ErrorName::InvalidHeaders,
            InboundError::InvalidExchange { .. } => ErrorName::InvalidExchange,
            InboundError::PublishFailed { .. } | InboundError::TaskFailed(_) => {
                ErrorName::PublishFailed
            }
            InboundError::Settle(_) => ErrorName::AckFailed,
        }
    }
}

/// Result type for inbound routing operations
pub type InboundResult<T> = Result<T, InboundError>;
