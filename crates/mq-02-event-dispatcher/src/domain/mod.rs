//! Domain module for the Event Dispatcher
//!
//! - dispatch_key: `messageType` over routing key
//! - routing_table: key → single handler, built once
//! - ack_policy: handler outcome → ack / reject / requeue

pub mod ack_policy;
pub mod dispatch_key;
pub mod routing_table;

pub use ack_policy::{AckAction, AckPolicy, RetryPolicy};
pub use dispatch_key::dispatch_key;
pub use routing_table::{HandlerRegistration, RoutingTable};
