//! Dispatch key derivation

use shared_types::Envelope;

/// Key used to select a handler.
///
/// A `messageType` string in a JSON object payload wins over the transport
/// routing key.
#[must_use]
pub fn dispatch_key(envelope: &Envelope) -> String {
    envelope
        .message_type()
        .unwrap_or_else(|| envelope.routing_key.clone())
}
