//! Domain module for the Inbound Router
//!
//! - headers: mandatory routing header checks
//! - destination: recipient exchange resolution
//! - fault_memory: single-slot deferred rejection after a channel failure
//! - forwarder: provenance injection and internal publish

pub mod destination;
pub mod fault_memory;
pub mod forwarder;
pub mod headers;

pub use destination::DestinationResolver;
pub use fault_memory::FaultMemory;
pub use forwarder::Forwarder;
pub use headers::{HeaderValidator, RoutingHeaders};
