//! # Log Error Codes
//!
//! Stable identifiers attached to every error log line so dashboards and
//! alerts can key on them instead of on message text.

use std::fmt;

/// Error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A message from an external counterparty failed validation.
    ValidationExternalInboundAmqp,
    /// The internal broker refused an operation.
    ConnectionInternalMq,
    /// An internal message could not be processed.
    ValidationInternalAmqp,
}

impl ErrorCode {
    /// Stable string form used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationExternalInboundAmqp => "ValidationExternalInboundAMQP",
            ErrorCode::ConnectionInternalMq => "ConnectionInternalMQ",
            ErrorCode::ValidationInternalAmqp => "ValidationInternalAMQP",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specific error within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorName {
    InvalidHeaders,
    InvalidExchange,
    PublishFailed,
    AckFailed,
    NoHandlerFound,
    MessageProcessingFailed,
}

impl ErrorName {
    /// Stable string form used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorName::InvalidHeaders => "InvalidHeaders",
            ErrorName::InvalidExchange => "InvalidExchange",
            ErrorName::PublishFailed => "PublishFailed",
            ErrorName::AckFailed => "AckFailed",
            ErrorName::NoHandlerFound => "NoHandlerFound",
            ErrorName::MessageProcessingFailed => "MessageProcessingFailed",
        }
    }
}

impl fmt::Display for ErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
