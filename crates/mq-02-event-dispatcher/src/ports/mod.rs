//! Ports for the Event Dispatcher
//!
//! - handler: the capability the dispatcher calls out to

pub mod handler;

pub use handler::EventHandler;
