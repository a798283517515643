//! # Shared Bus - Broker Ports and In-Memory Broker
//!
//! Every subsystem talks to the message broker through the ports defined here
//! and never through a concrete client.
//!
//! ## Topology
//!
//! ```text
//! ┌──────────────┐  publish()   ┌──────────┐  bindings  ┌─────────┐
//! │ BrokerChannel│ ───────────→ │ Exchange │ ─────────→ │  Queue  │
//! └──────────────┘              └──────────┘            └─────────┘
//!        ↑                                                   │
//!        └──────────── get() / consume() ────────────────────┘
//!                      ack() / reject(requeue)
//!                            │
//!                            ↓ reject(requeue = false)
//!                      dead-letter exchange
//! ```
//!
//! ## Guarantees
//!
//! - **At-least-once:** unacknowledged deliveries go back to the head of
//!   their queue when the channel closes, marked redelivered.
//! - **Channel as unit of failure:** see [`BrokerError::is_channel_fatal`].
//! - **No deduplication:** message ids are never inspected.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod channel;
pub mod error;
pub mod exchange;
pub mod memory;
pub mod subscriber;

// Re-export main types
pub use channel::{BrokerChannel, BrokerConnection, Delivery, DeliveryStream};
pub use error::{BrokerError, ChannelId};
pub use exchange::{topic_matches, Binding, ExchangeKind};
pub use memory::{InMemoryBroker, InMemoryChannel, QueueOptions};
pub use subscriber::InMemoryConsumer;

/// URI scheme of the in-memory broker.
pub const MEMORY_SCHEME: &str = "memory://";
