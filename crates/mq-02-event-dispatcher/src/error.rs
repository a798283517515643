//! Error types for the Event Dispatcher subsystem

use shared_bus::BrokerError;
use thiserror::Error;

/// Failure reported by an event handler.
///
/// The variant decides the acknowledgment: [`HandlerError::InvalidMessage`]
/// is permanent, everything else is treated as transient.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload can never be processed; redelivery cannot help
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A dependency is temporarily unavailable
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Any other failure, treated as transient
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Returns true for the permanent failure kind.
    #[must_use]
    pub fn is_invalid_message(&self) -> bool {
        matches!(self, HandlerError::InvalidMessage(_))
    }
}

/// Dispatcher errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Two handlers claim the same key (startup misconfiguration)
    #[error("Key {key} is claimed by both {first} and {second}")]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },

    /// A handler claims an empty key (startup misconfiguration)
    #[error("Handler {handler} claims an empty key")]
    EmptyKey { handler: String },

    /// Broker operation failed
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Result type for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;
