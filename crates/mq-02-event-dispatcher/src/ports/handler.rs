//! Event handler port

use async_trait::async_trait;
use shared_types::Envelope;

use crate::error::HandlerError;

/// A business handler fed by the dispatcher.
///
/// Handlers are invoked at least once per message and must tolerate
/// redelivery; the dispatcher never deduplicates.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Routing keys or message types this handler claims. Called once at startup.
    fn keys_to_process(&self) -> Vec<String>;

    /// Process one message.
    ///
    /// # Errors
    ///
    /// - `HandlerError::InvalidMessage` - the message is rejected for good
    /// - anything else - the message is requeued
    async fn process_event(&self, envelope: &Envelope) -> Result<(), HandlerError>;

    /// Name used in logs and startup errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
