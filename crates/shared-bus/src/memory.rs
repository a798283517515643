//! # In-Memory Broker
//!
//! Single-process broker with AMQP 0-9-1 channel semantics. Suitable for
//! single-node operation and for tests; a networked deployment would put an
//! AMQP client behind the same ports.
//!
//! ## Channel Failure Model
//!
//! ```text
//! [OPEN] ──check/publish missing exchange──→ [CLOSED]
//!   │    ──get missing queue──────────────→ [CLOSED]
//!   │    ──ack/reject unknown tag─────────→ [CLOSED]
//!   └────close()──────────────────────────→ [CLOSED]
//!
//! On close: unacked deliveries return to the HEAD of their queues,
//! in original order, marked redelivered.
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::Envelope;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::channel::{BrokerChannel, BrokerConnection, Delivery, DeliveryStream};
use crate::error::{BrokerError, ChannelId};
use crate::exchange::{Binding, ExchangeKind};
use crate::subscriber::InMemoryConsumer;

/// Queue declaration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// Exchange that receives messages rejected without requeue.
    pub dead_letter_exchange: Option<String>,
}

impl QueueOptions {
    /// Options with a dead-letter exchange.
    #[must_use]
    pub fn with_dead_letter(exchange: impl Into<String>) -> Self {
        Self {
            dead_letter_exchange: Some(exchange.into()),
        }
    }
}

#[derive(Debug)]
struct Exchange {
    kind: ExchangeKind,
    bindings: Vec<Binding>,
}

#[derive(Debug, Clone)]
struct QueuedMessage {
    envelope: Envelope,
    /// Deliveries so far.
    delivery_count: u32,
}

#[derive(Debug, Default)]
struct Queue {
    ready: VecDeque<QueuedMessage>,
    options: QueueOptions,
}

#[derive(Debug)]
struct Unacked {
    queue: String,
    message: QueuedMessage,
}

#[derive(Debug, Default)]
struct ChannelState {
    next_delivery_tag: u64,
    unacked: BTreeMap<u64, Unacked>,
}

#[derive(Debug, Default)]
struct BrokerState {
    exchanges: HashMap<String, Exchange>,
    queues: HashMap<String, Queue>,
    channels: HashMap<ChannelId, ChannelState>,
    next_channel_id: ChannelId,
}

impl BrokerState {
    /// Copy `envelope` into every queue bound to `exchange` that matches.
    fn route(&mut self, exchange: &str, envelope: &Envelope) -> Result<usize, BrokerError> {
        let ex = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound {
                exchange: exchange.to_string(),
            })?;

        let targets: Vec<String> = ex
            .bindings
            .iter()
            .filter(|binding| binding.matches(ex.kind, &envelope.routing_key))
            .map(|binding| binding.queue.clone())
            .collect();

        let mut routed = 0;
        for queue_name in targets {
            if let Some(queue) = self.queues.get_mut(&queue_name) {
                queue.ready.push_back(QueuedMessage {
                    envelope: envelope.clone(),
                    delivery_count: 0,
                });
                routed += 1;
            }
        }

        if routed == 0 {
            debug!(
                exchange = exchange,
                routing_key = %envelope.routing_key,
                "Message unroutable, dropped"
            );
        }
        Ok(routed)
    }

    fn ensure_open(&self, channel_id: ChannelId) -> Result<(), BrokerError> {
        if self.channels.contains_key(&channel_id) {
            Ok(())
        } else {
            Err(BrokerError::ChannelClosed { channel_id })
        }
    }

    /// Close a channel and return its unacked deliveries to their queues.
    fn close_channel(&mut self, channel_id: ChannelId) -> bool {
        let Some(channel) = self.channels.remove(&channel_id) else {
            return false;
        };

        // Reverse tag order + push_front keeps the original queue order.
        for (_, unacked) in channel.unacked.into_iter().rev() {
            match self.queues.get_mut(&unacked.queue) {
                Some(queue) => queue.ready.push_front(unacked.message),
                None => warn!(queue = %unacked.queue, "Queue vanished, unacked message lost"),
            }
        }
        debug!(channel_id, "Channel closed");
        true
    }

    /// Fail a channel-fatal operation: close the channel and hand back `error`.
    fn fail(&mut self, channel_id: ChannelId, error: BrokerError) -> BrokerError {
        warn!(channel_id, error = %error, "Channel-fatal broker error");
        self.close_channel(channel_id);
        error
    }

    fn take(&mut self, channel_id: ChannelId, queue_name: &str) -> Result<Option<Delivery>, BrokerError> {
        self.ensure_open(channel_id)?;

        let Some(queue) = self.queues.get_mut(queue_name) else {
            let error = BrokerError::QueueNotFound {
                queue: queue_name.to_string(),
            };
            return Err(self.fail(channel_id, error));
        };

        let Some(mut message) = queue.ready.pop_front() else {
            return Ok(None);
        };
        message.delivery_count = message.delivery_count.saturating_add(1);

        let channel = self
            .channels
            .get_mut(&channel_id)
            .ok_or(BrokerError::ChannelClosed { channel_id })?;
        channel.next_delivery_tag += 1;
        let delivery_tag = channel.next_delivery_tag;

        let delivery = Delivery {
            envelope: message.envelope.clone(),
            delivery_tag,
            channel_id,
            queue: queue_name.to_string(),
            redelivered: message.delivery_count > 1,
            delivery_count: message.delivery_count,
        };
        channel.unacked.insert(
            delivery_tag,
            Unacked {
                queue: queue_name.to_string(),
                message,
            },
        );
        Ok(Some(delivery))
    }

    fn settle(&mut self, channel_id: ChannelId, delivery_tag: u64) -> Result<Unacked, BrokerError> {
        self.ensure_open(channel_id)?;

        let removed = self
            .channels
            .get_mut(&channel_id)
            .and_then(|channel| channel.unacked.remove(&delivery_tag));

        match removed {
            Some(unacked) => Ok(unacked),
            None => Err(self.fail(
                channel_id,
                BrokerError::UnknownDeliveryTag {
                    channel_id,
                    delivery_tag,
                },
            )),
        }
    }

    fn dead_letter(&mut self, unacked: Unacked) {
        let dlx = self
            .queues
            .get(&unacked.queue)
            .and_then(|queue| queue.options.dead_letter_exchange.clone());

        match dlx {
            Some(dlx) => {
                if let Err(e) = self.route(&dlx, &unacked.message.envelope) {
                    warn!(queue = %unacked.queue, error = %e, "Dead-letter routing failed, message dropped");
                }
            }
            None => debug!(queue = %unacked.queue, "Rejected message dropped (no dead-letter exchange)"),
        }
    }
}

pub(crate) struct BrokerInner {
    state: Mutex<BrokerState>,
    pub(crate) notify: Notify,
}

/// In-memory broker.
///
/// Cloning is cheap; all clones share the same exchanges, queues and channels.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

impl InMemoryBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                state: Mutex::new(BrokerState::default()),
                notify: Notify::new(),
            }),
        }
    }

    /// Declare an exchange. Redeclaring with the same kind is a no-op.
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), BrokerError> {
        let mut state = self.inner.state.lock();
        match state.exchanges.get(name) {
            Some(existing) if existing.kind != kind => Err(BrokerError::TopologyConflict(format!(
                "exchange {name} already declared as {:?}",
                existing.kind
            ))),
            Some(_) => Ok(()),
            None => {
                state.exchanges.insert(
                    name.to_string(),
                    Exchange {
                        kind,
                        bindings: Vec::new(),
                    },
                );
                debug!(exchange = name, kind = ?kind, "Exchange declared");
                Ok(())
            }
        }
    }

    /// Declare a queue. Redeclaring with the same options is a no-op.
    pub fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<(), BrokerError> {
        let mut state = self.inner.state.lock();
        match state.queues.get(name) {
            Some(existing) if existing.options != options => Err(BrokerError::TopologyConflict(
                format!("queue {name} already declared with different options"),
            )),
            Some(_) => Ok(()),
            None => {
                state.queues.insert(
                    name.to_string(),
                    Queue {
                        ready: VecDeque::new(),
                        options,
                    },
                );
                debug!(queue = name, "Queue declared");
                Ok(())
            }
        }
    }

    /// Bind `queue` to `exchange` with a binding key (pattern for topic exchanges).
    pub fn bind_queue(&self, queue: &str, exchange: &str, key: &str) -> Result<(), BrokerError> {
        let mut state = self.inner.state.lock();
        if !state.queues.contains_key(queue) {
            return Err(BrokerError::QueueNotFound {
                queue: queue.to_string(),
            });
        }
        let ex = state
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound {
                exchange: exchange.to_string(),
            })?;

        let binding = Binding::new(queue, key);
        if !ex.bindings.contains(&binding) {
            ex.bindings.push(binding);
        }
        Ok(())
    }

    /// Delete an exchange. Returns true if it existed.
    pub fn delete_exchange(&self, name: &str) -> bool {
        self.inner.state.lock().exchanges.remove(name).is_some()
    }

    /// Returns true if the exchange exists.
    #[must_use]
    pub fn exchange_exists(&self, name: &str) -> bool {
        self.inner.state.lock().exchanges.contains_key(name)
    }

    /// Number of ready (not yet delivered) messages in a queue.
    #[must_use]
    pub fn queue_depth(&self, name: &str) -> Option<usize> {
        self.inner
            .state
            .lock()
            .queues
            .get(name)
            .map(|queue| queue.ready.len())
    }

    /// Number of deliveries awaiting a verdict across all channels.
    #[must_use]
    pub fn unacked_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .channels
            .values()
            .map(|channel| channel.unacked.len())
            .sum()
    }

    /// Number of open channels.
    #[must_use]
    pub fn open_channels(&self) -> usize {
        self.inner.state.lock().channels.len()
    }

    /// Open a new channel.
    #[must_use]
    pub fn open_channel(&self) -> InMemoryChannel {
        let mut state = self.inner.state.lock();
        state.next_channel_id += 1;
        let id = state.next_channel_id;
        state.channels.insert(id, ChannelState::default());
        debug!(channel_id = id, "Channel opened");

        InMemoryChannel {
            id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerConnection for InMemoryBroker {
    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        Ok(Arc::new(self.open_channel()))
    }
}

/// A channel on an [`InMemoryBroker`].
#[derive(Clone)]
pub struct InMemoryChannel {
    id: ChannelId,
    inner: Arc<BrokerInner>,
}

impl InMemoryChannel {
    pub(crate) fn inner(&self) -> &Arc<BrokerInner> {
        &self.inner
    }

    /// Pull one message without waiting.
    pub(crate) fn try_take(&self, queue: &str) -> Result<Option<Delivery>, BrokerError> {
        let result = self.inner.state.lock().take(self.id, queue);
        if matches!(result, Err(BrokerError::QueueNotFound { .. })) {
            self.inner.notify.notify_waiters();
        }
        result
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.inner.state.lock().channels.contains_key(&self.id)
    }

    async fn check_exchange(&self, exchange: &str) -> Result<(), BrokerError> {
        let result = {
            let mut state = self.inner.state.lock();
            state.ensure_open(self.id)?;
            if state.exchanges.contains_key(exchange) {
                Ok(())
            } else {
                let error = BrokerError::ExchangeNotFound {
                    exchange: exchange.to_string(),
                };
                Err(state.fail(self.id, error))
            }
        };
        if result.is_err() {
            self.inner.notify.notify_waiters();
        }
        result
    }

    async fn publish(&self, exchange: &str, envelope: Envelope) -> Result<(), BrokerError> {
        let result = {
            let mut state = self.inner.state.lock();
            state.ensure_open(self.id)?;
            match state.route(exchange, &envelope) {
                Ok(_) => Ok(()),
                Err(error) => Err(state.fail(self.id, error)),
            }
        };
        self.inner.notify.notify_waiters();
        result
    }

    async fn get(&self, queue: &str) -> Result<Option<Delivery>, BrokerError> {
        self.try_take(queue)
    }

    async fn consume(&self, queue: &str) -> Result<Box<dyn DeliveryStream>, BrokerError> {
        self.inner.state.lock().ensure_open(self.id)?;
        Ok(Box::new(InMemoryConsumer::new(self.clone(), queue)))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        let result = self
            .inner
            .state
            .lock()
            .settle(self.id, delivery.delivery_tag)
            .map(|_| ());
        if result.is_err() {
            self.inner.notify.notify_waiters();
        }
        result
    }

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), BrokerError> {
        let result = {
            let mut state = self.inner.state.lock();
            match state.settle(self.id, delivery.delivery_tag) {
                Ok(unacked) if requeue => {
                    if let Some(queue) = state.queues.get_mut(&unacked.queue) {
                        queue.ready.push_front(unacked.message);
                    }
                    Ok(())
                }
                Ok(unacked) => {
                    state.dead_letter(unacked);
                    Ok(())
                }
                Err(error) => Err(error),
            }
        };
        self.inner.notify.notify_waiters();
        result
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.inner.state.lock().close_channel(self.id);
        self.inner.notify.notify_waiters();
        Ok(())
    }
}
