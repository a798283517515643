//! # Message Envelope
//!
//! The unit of transfer for every message that crosses the broker, whether it
//! arrives from an external counterparty or is pulled from an internal source.
//!
//! ## Properties
//!
//! - **Headers**: string-to-string map. Order is irrelevant; a `BTreeMap` keeps
//!   log output deterministic.
//! - **Routing Key**: dot-delimited topic used by topic/direct exchanges.
//! - **Payload**: opaque bytes. The core only ever peeks at a top-level
//!   `messageType` string (see [`Envelope::message_type`]).
//! - **Message Id**: correlation only. It is NEVER used for deduplication.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Message headers.
pub type Headers = BTreeMap<String, String>;

/// Placeholder used in logs when a message carries no id.
pub const UNKNOWN_MESSAGE_ID: &str = "<none>";

/// A broker message as seen by the routing core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Transport headers.
    pub headers: Headers,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Raw message body.
    pub payload: Vec<u8>,
    /// Caller-supplied message id (correlation only).
    pub message_id: Option<String>,
}

impl Envelope {
    /// Create an envelope with no headers and no message id.
    #[must_use]
    pub fn new(routing_key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: Headers::new(),
            routing_key: routing_key.into(),
            payload: payload.into(),
            message_id: None,
        }
    }

    /// Create an envelope whose payload is the JSON encoding of `value`.
    pub fn json<T: Serialize>(
        routing_key: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(routing_key, serde_json::to_vec(value)?))
    }

    /// Builder: add or replace a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Builder: replace all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Builder: set the message id.
    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Look up a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Message id for logging, or [`UNKNOWN_MESSAGE_ID`].
    #[must_use]
    pub fn message_id_or_unknown(&self) -> &str {
        self.message_id.as_deref().unwrap_or(UNKNOWN_MESSAGE_ID)
    }

    /// Payload decoded as JSON, if it is valid JSON.
    #[must_use]
    pub fn payload_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.payload).ok()
    }

    /// The `messageType` field embedded in a JSON object payload.
    ///
    /// Returns `None` for non-JSON payloads, non-object payloads, and objects
    /// where `messageType` is absent or not a string.
    #[must_use]
    pub fn message_type(&self) -> Option<String> {
        // Derived structs also accept JSON arrays; only objects carry a tag.
        let first = self.payload.iter().find(|b| !b.is_ascii_whitespace())?;
        if *first != b'{' {
            return None;
        }
        serde_json::from_slice::<MessageTag>(&self.payload)
            .ok()?
            .message_type
    }
}

/// The one payload field the routing core reads. Other fields are skipped
/// without being materialised.
#[derive(Deserialize)]
struct MessageTag {
    #[serde(rename = "messageType")]
    message_type: Option<String>,
}
