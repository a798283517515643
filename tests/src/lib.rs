//! # MQ Relay Test Suite
//!
//! Cross-crate scenarios run against the in-memory broker.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks for the hot paths
//! └── src/integration/
//!     ├── support.rs          # Topology fixtures, recording handler
//!     ├── inbound_routing.rs  # Partner queue → recipient exchange
//!     ├── event_dispatch.rs   # Source queue → handler → verdict
//!     └── relay_flow.rs       # Both subsystems wired by the runtime
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mq-tests
//! cargo test -p mq-tests integration::event_dispatch::
//! cargo bench -p mq-tests
//! ```

#![allow(dead_code)]

pub mod integration;
