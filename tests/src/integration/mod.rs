//! Integration scenarios.

#[cfg(test)]
mod support;

pub mod event_dispatch;
pub mod inbound_routing;
pub mod relay_flow;
