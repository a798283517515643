//! # Built-in Handlers
//!
//! The relay ships one handler: an audit log that records every internal
//! message whose key it claims. Deployments plug their own handlers in
//! through [`crate::RelayRuntime::start`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mq_02_event_dispatcher::{EventHandler, HandlerError};
use shared_types::Envelope;
use tracing::info;

/// Logs each JSON message it receives and counts them.
///
/// A payload that is not JSON can never be audited and is rejected as an
/// invalid message.
pub struct AuditLogHandler {
    keys: Vec<String>,
    processed: AtomicU64,
}

impl AuditLogHandler {
    pub fn new<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            processed: AtomicU64::new(0),
        }
    }

    /// Messages audited so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for AuditLogHandler {
    fn keys_to_process(&self) -> Vec<String> {
        self.keys.clone()
    }

    async fn process_event(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let payload = envelope
            .payload_json()
            .ok_or_else(|| HandlerError::InvalidMessage("payload is not JSON".to_string()))?;

        info!(
            message_id = envelope.message_id_or_unknown(),
            routing_key = %envelope.routing_key,
            message_type = ?envelope.message_type(),
            payload = %payload,
            "Audited message"
        );
        self.processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "audit-log"
    }
}
