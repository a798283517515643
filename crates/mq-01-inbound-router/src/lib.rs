//! # mq-01-inbound-router
//!
//! Inbound Router: accepts messages from external counterparties, validates
//! their routing headers and forwards them to the recipient's internal
//! exchange.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Header Validation**: `sender-id` and `recipient-id` are mandatory
//! - **Destination Resolution**: `{recipient-id}-EXCHANGE`, checked before use
//! - **Provenance**: `sender-platform` injected on forward
//! - **Fault Memory**: deferred rejection after a channel-breaking failure
//!
//! ## Architecture
//!
//! ```text
//! {PARTNER}-INBOUND-QUEUE ──→ InboundRouter ──komgo.internal──→ {RECIPIENT}-EXCHANGE
//!           │                      │
//!           │               reject(requeue=false)
//!           ↓                      ↓
//! {PARTNER}-INBOUND-EXCHANGE-DEAD ──→ {PARTNER}-INBOUND-QUEUE-DEAD
//! ```
//!
//! ## Routing Decision
//!
//! | Condition | Verdict |
//! |-----------|---------|
//! | Consumer cancelled | none |
//! | Previous message faulty | reject |
//! | Missing header | reject |
//! | Recipient exchange missing | none, fault memory armed |
//! | Publish failed | none |
//! | Forwarded | ack |
//!
//! External messages are never requeued: a message that fails validation
//! fails identically on redelivery.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mq_01_inbound_router::{InboundConsumer, InboundConsumerConfig, InboundRouter};
//!
//! let consumer = InboundConsumer::spawn(
//!     connection,
//!     InboundRouter::new("VAKT"),
//!     InboundConsumerConfig::new("VAKT-INBOUND-QUEUE"),
//! );
//! // ...
//! consumer.stop().await?;
//! ```

pub mod consumer;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod service;

pub use consumer::{InboundConsumer, InboundConsumerConfig, DEFAULT_RECONNECT_DELAY};
pub use domain::{DestinationResolver, FaultMemory, Forwarder, HeaderValidator, RoutingHeaders};
pub use error::{InboundError, InboundResult};
pub use service::{InboundRouter, RouteOutcome};
