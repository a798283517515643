//! # Relay Runtime Library
//!
//! Exposes the runtime wiring for tests. The binary entry point is `main.rs`.
//!
//! - `config` - `MQ_*` environment configuration
//! - `topology` - exchange and queue declarations
//! - `handlers` - built-in event handlers
//! - `runtime` - component lifecycle

pub mod config;
pub mod handlers;
pub mod runtime;
pub mod topology;

pub use config::{ConfigError, RuntimeConfig};
pub use handlers::AuditLogHandler;
pub use runtime::{RelayRuntime, RuntimeError};
pub use topology::declare_topology;
