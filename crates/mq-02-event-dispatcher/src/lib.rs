//! # mq-02-event-dispatcher
//!
//! Event Dispatcher: polls internal message sources, selects exactly one
//! handler per message and turns the handler's result into an ack, a reject
//! or a requeue.
//!
//! ## Overview
//!
//! - **Routing Table**: key → handler, built once from explicit registrations
//! - **Dispatch Key**: payload `messageType` first, routing key second
//! - **Ack Policy**: success → ack, invalid message → reject, other → requeue
//! - **Retry Policy**: optional attempt ceiling and per-source cooldown
//!
//! ## Message Lifecycle
//!
//! ```text
//! Pulled ──→ NoHandler ──→ Rejected
//!   │
//!   └──→ Dispatched ──→ Acked
//!              ├──────→ Rejected
//!              └──────→ Requeued ──→ (pulled again on a later tick)
//! ```
//!
//! ## Concurrency
//!
//! One tick polls every source sequentially and awaits each handler, so a
//! dispatcher never runs two handlers at once. There is no handler timeout:
//! a hung handler stalls polling.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mq_02_event_dispatcher::{DispatcherConfig, HandlerRegistration, PollingDispatcher};
//!
//! let dispatcher = Arc::new(PollingDispatcher::new(
//!     DispatcherConfig::default(),
//!     connection,
//!     vec![HandlerRegistration::from_handler(trade_handler)],
//! )?);
//! dispatcher.start();
//! // ...
//! dispatcher.stop().await;
//! ```

pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{dispatch_key, AckAction, AckPolicy, HandlerRegistration, RetryPolicy, RoutingTable};
pub use error::{DispatchError, DispatchResult, HandlerError};
pub use ports::EventHandler;
pub use service::{DispatcherConfig, PollOutcome, PollingDispatcher, PollingSource};
