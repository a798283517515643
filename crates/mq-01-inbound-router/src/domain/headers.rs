//! Mandatory routing header validation

use shared_types::{Envelope, RECIPIENT_ID_HEADER, SENDER_ID_HEADER};

use crate::error::{InboundError, InboundResult};

/// Identifiers extracted from a valid inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingHeaders {
    pub sender_id: String,
    pub recipient_id: String,
}

/// Checks that an envelope carries `sender-id` and `recipient-id`.
///
/// An empty header value counts as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderValidator;

impl HeaderValidator {
    /// Extract the routing headers or report the first missing one.
    pub fn validate(envelope: &Envelope) -> InboundResult<RoutingHeaders> {
        let sender_id = Self::required(envelope, SENDER_ID_HEADER)?;
        let recipient_id = Self::required(envelope, RECIPIENT_ID_HEADER)?;
        Ok(RoutingHeaders {
            sender_id,
            recipient_id,
        })
    }

    fn required(envelope: &Envelope, name: &'static str) -> InboundResult<String> {
        match envelope.header(name) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(InboundError::InvalidHeaders { missing: name }),
        }
    }
}
