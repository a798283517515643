//! Inbound Consumer - channel supervision for one partner queue
//!
//! ```text
//! ┌─→ create_channel ──→ consume(queue) ──→ route(delivery) ──┐
//! │                                  ↑                        │
//! │                                  └──── next delivery ─────┘
//! │                                            │
//! │                                      stream ended
//! │                                            ↓
//! └──────── reconnect delay ←──────── route(None)
//! ```
//!
//! The router (and its fault memory) outlives every channel, so the message
//! redelivered after a channel failure is the one that gets drained.

use std::sync::Arc;
use std::time::Duration;

use shared_bus::{BrokerChannel, BrokerConnection};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{InboundError, InboundResult};
use crate::service::InboundRouter;

/// Default delay before a closed channel is re-created.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Consumer configuration
#[derive(Clone, Debug)]
pub struct InboundConsumerConfig {
    /// Partner inbound queue to consume
    pub queue: String,
    /// Delay before re-creating a closed channel
    pub reconnect_delay: Duration,
}

impl InboundConsumerConfig {
    /// Config for `queue` with the default reconnect delay.
    #[must_use]
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Handle of a running inbound consumer task.
pub struct InboundConsumer {
    partner: String,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<InboundRouter>,
}

impl InboundConsumer {
    /// Spawn the consumer loop for `router`.
    #[must_use]
    pub fn spawn(
        connection: Arc<dyn BrokerConnection>,
        router: InboundRouter,
        config: InboundConsumerConfig,
    ) -> Self {
        let partner = router.partner().to_string();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(connection, router, config, shutdown_rx));
        Self {
            partner,
            shutdown_tx,
            handle,
        }
    }

    /// Partner served by this consumer.
    #[must_use]
    pub fn partner(&self) -> &str {
        &self.partner
    }

    /// Stop consuming and wait for the task.
    ///
    /// A message already being routed is allowed to finish. Returns the
    /// router so its state can be inspected or reused.
    pub async fn stop(self) -> InboundResult<InboundRouter> {
        // Receiver gone means the task already ended
        let _ = self.shutdown_tx.send(true);
        self.handle
            .await
            .map_err(|e| InboundError::TaskFailed(e.to_string()))
    }
}

async fn run(
    connection: Arc<dyn BrokerConnection>,
    mut router: InboundRouter,
    config: InboundConsumerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> InboundRouter {
    let partner = router.partner().to_string();

    while !*shutdown.borrow() {
        match consume_once(&connection, &mut router, &config.queue, &mut shutdown).await {
            Ok(Session::Shutdown) => break,
            Ok(Session::Ended) => {
                info!(partner = %partner, queue = %config.queue, "Channel closed, reconnecting");
            }
            Err(e) => {
                warn!(partner = %partner, queue = %config.queue, error = %e, "Failed to open consumer");
            }
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    info!(partner = %partner, "Inbound consumer stopped");
    router
}

enum Session {
    Shutdown,
    Ended,
}

async fn consume_once(
    connection: &Arc<dyn BrokerConnection>,
    router: &mut InboundRouter,
    queue: &str,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Session, shared_bus::BrokerError> {
    let channel: Arc<dyn BrokerChannel> = connection.create_channel().await?;
    let mut stream = channel.consume(queue).await?;
    info!(partner = %router.partner(), queue = queue, channel_id = channel.id(), "Consuming");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if let Err(e) = channel.close().await {
                    warn!(error = %e, "Failed to close channel on shutdown");
                }
                return Ok(Session::Shutdown);
            }
            next = stream.next_delivery() => {
                let ended = next.is_none();
                router.route(channel.as_ref(), next).await;
                if ended {
                    return Ok(Session::Ended);
                }
            }
        }
    }
}
