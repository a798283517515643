//! # Push Consumer
//!
//! Push subscription on an in-memory queue with a prefetch of one: the next
//! message is only taken from the queue when the caller asks for it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::channel::{BrokerChannel, Delivery, DeliveryStream};
use crate::error::BrokerError;
use crate::memory::InMemoryChannel;

/// A consumer handle for receiving deliveries from one queue.
///
/// The consumer is cancelled when its channel closes.
pub struct InMemoryConsumer {
    channel: InMemoryChannel,
    queue: String,
}

impl InMemoryConsumer {
    pub(crate) fn new(channel: InMemoryChannel, queue: &str) -> Self {
        Self {
            channel,
            queue: queue.to_string(),
        }
    }

    /// Queue this consumer is attached to.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

#[async_trait]
impl DeliveryStream for InMemoryConsumer {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        let inner = Arc::clone(self.channel.inner());
        loop {
            // Register interest before checking state so a notify between the
            // check and the await is not lost.
            let notified = inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.channel.try_take(&self.queue) {
                Ok(Some(delivery)) => return Some(delivery),
                Ok(None) => {}
                Err(BrokerError::ChannelClosed { channel_id }) => {
                    debug!(channel_id, queue = %self.queue, "Consumer cancelled");
                    return None;
                }
                Err(e) => {
                    debug!(queue = %self.queue, error = %e, "Consumer cancelled");
                    return None;
                }
            }

            if !self.channel.is_open() {
                return None;
            }
            notified.await;
        }
    }
}
