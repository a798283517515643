//! # Shared Types Crate
//!
//! This crate contains the message [`Envelope`] and the naming conventions that
//! the inbound router, the event dispatcher and the runtime agree on.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: header names, the internal routing key and
//!   exchange/queue names are defined here and nowhere else.
//! - **Opaque Payloads**: the envelope never interprets its payload beyond the
//!   optional `messageType` field used for dispatch.
//! - **No Deduplication**: `message_id` is for correlation in logs only.

pub mod codes;
pub mod envelope;
pub mod topology;

pub use codes::{ErrorCode, ErrorName};
pub use envelope::{Envelope, Headers, UNKNOWN_MESSAGE_ID};

/// Header carrying the sending member's identifier.
pub const SENDER_ID_HEADER: &str = "sender-id";

/// Header carrying the recipient member's identifier.
pub const RECIPIENT_ID_HEADER: &str = "recipient-id";

/// Header injected on forward, naming the external platform a message came from.
pub const SENDER_PLATFORM_HEADER: &str = "sender-platform";

/// Routing key of every message forwarded by the inbound router.
pub const INTERNAL_ROUTING_KEY: &str = "komgo.internal";

/// Payload field that takes precedence over the routing key for dispatch.
pub const MESSAGE_TYPE_FIELD: &str = "messageType";
