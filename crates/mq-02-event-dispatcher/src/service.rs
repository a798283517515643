//! Polling Dispatcher - Core dispatch loop
//!
//! Every tick, each source is polled in order: pull at most one message,
//! derive its dispatch key, invoke the owning handler, apply the verdict.
//! Handler calls are awaited inside the tick, so one dispatcher never
//! processes two messages concurrently.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use shared_bus::{BrokerChannel, BrokerConnection, BrokerError, Delivery};
use shared_types::{topology, ErrorCode, ErrorName};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::{dispatch_key, AckAction, AckPolicy, HandlerRegistration, RetryPolicy, RoutingTable};
use crate::error::{DispatchResult, HandlerError};
use crate::metrics;

/// A logical message source and the queue backing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingSource {
    pub id: String,
    pub queue: String,
}

impl PollingSource {
    #[must_use]
    pub fn new(id: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            queue: queue.into(),
        }
    }

    /// Source read by `consumer_id` from its conventional queue `{consumer}.{source}`.
    #[must_use]
    pub fn for_consumer(consumer_id: &str, source_id: &str) -> Self {
        Self::new(source_id, topology::source_queue(consumer_id, source_id))
    }
}

/// Dispatcher configuration
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Consumer identifier (logs)
    pub consumer_id: String,
    /// Sources polled each tick, in order
    pub sources: Vec<PollingSource>,
    /// Tick interval
    pub polling_interval: Duration,
    /// Retry ceiling and cooldown
    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            consumer_id: "relay".to_string(),
            sources: Vec::new(),
            polling_interval: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of one poll of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing pending.
    Empty,
    /// Source cooling down after a requeue; nothing pulled.
    CoolingDown,
    /// No handler owns `key`; rejected.
    NoHandler { key: String },
    /// Handler invoked and `action` applied.
    Processed { key: String, action: AckAction },
    /// The broker refused the pull or the verdict.
    BrokerFailed,
}

/// Polls internal sources and dispatches messages to handlers.
pub struct PollingDispatcher {
    config: DispatcherConfig,
    connection: Arc<dyn BrokerConnection>,
    table: RoutingTable,
    policy: AckPolicy,
    channel: tokio::sync::Mutex<Option<Arc<dyn BrokerChannel>>>,
    cooldowns: Mutex<HashMap<String, Instant>>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingDispatcher {
    /// Build a dispatcher. Fails fast on conflicting handler registrations.
    pub fn new(
        config: DispatcherConfig,
        connection: Arc<dyn BrokerConnection>,
        registrations: Vec<HandlerRegistration>,
    ) -> DispatchResult<Self> {
        let table = match RoutingTable::build(registrations) {
            Ok(table) => table,
            Err(e) => {
                error!(consumer_id = %config.consumer_id, error = %e, "Invalid handler registration");
                return Err(e);
            }
        };
        info!(
            consumer_id = %config.consumer_id,
            keys = ?table.keys(),
            sources = config.sources.len(),
            "Routing table built"
        );

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            policy: AckPolicy::new(config.retry.clone()),
            config,
            connection,
            table,
            channel: tokio::sync::Mutex::new(None),
            cooldowns: Mutex::new(HashMap::new()),
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    #[must_use]
    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    /// Returns true while the polling task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Start polling on the configured interval.
    ///
    /// Calling `start` on a running or stopped dispatcher does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() || *self.shutdown_tx.borrow() {
            warn!(consumer_id = %self.config.consumer_id, "Dispatcher already started or stopped");
            return;
        }

        let dispatcher = Arc::clone(self);
        let mut shutdown = self.shutdown_tx.subscribe();
        *task = Some(tokio::spawn(async move {
            // interval() panics on a zero period
            let period = dispatcher.config.polling_interval.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => {
                        dispatcher.poll_cycle().await;
                    }
                }
            }
            debug!(consumer_id = %dispatcher.config.consumer_id, "Polling loop ended");
        }));
        info!(
            consumer_id = %self.config.consumer_id,
            interval_ms = u64::try_from(self.config.polling_interval.as_millis()).unwrap_or(u64::MAX),
            "Dispatcher started"
        );
    }

    /// Halt the timer, let the current tick finish, then close the channel.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(consumer_id = %self.config.consumer_id, error = %e, "Polling task failed");
            }
        }

        let channel = self.channel.lock().await.take();
        if let Some(channel) = channel {
            if let Err(e) = channel.close().await {
                warn!(consumer_id = %self.config.consumer_id, error = %e, "Failed to close channel");
            }
        }
        info!(consumer_id = %self.config.consumer_id, "Dispatcher stopped");
    }

    /// Poll every source once, sequentially.
    pub async fn poll_cycle(&self) -> Vec<PollOutcome> {
        let mut outcomes = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            outcomes.push(self.poll_once(source).await);
        }
        outcomes
    }

    /// Pull and dispatch at most one message from `source`.
    pub async fn poll_once(&self, source: &PollingSource) -> PollOutcome {
        if self.is_cooling_down(&source.id) {
            return PollOutcome::CoolingDown;
        }

        let channel = match self.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                self.log_broker_error(source, &e);
                return PollOutcome::BrokerFailed;
            }
        };

        let delivery = match channel.get(&source.queue).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => return PollOutcome::Empty,
            Err(e) => {
                self.log_broker_error(source, &e);
                return PollOutcome::BrokerFailed;
            }
        };
        metrics::record_received(&source.id);

        let key = dispatch_key(&delivery.envelope);
        let message_id = delivery.envelope.message_id_or_unknown().to_string();

        let Some(handler) = self.table.lookup(&key) else {
            error!(
                error_code = %ErrorCode::ValidationInternalAmqp,
                error_name = %ErrorName::NoHandlerFound,
                source = %source.id,
                dispatch_key = %key,
                message_id = %message_id,
                "No handler for message, rejecting"
            );
            return if self.settle(channel.as_ref(), source, &delivery, AckAction::Reject).await {
                PollOutcome::NoHandler { key }
            } else {
                PollOutcome::BrokerFailed
            };
        };

        // A panicking handler counts as a transient failure; the tick goes on.
        let result = match AssertUnwindSafe(handler.process_event(&delivery.envelope))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::Other(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        let action = self.policy.classify(&result, delivery.delivery_count);

        if let Err(e) = &result {
            error!(
                error_code = %ErrorCode::ValidationInternalAmqp,
                error_name = %ErrorName::MessageProcessingFailed,
                source = %source.id,
                dispatch_key = %key,
                message_id = %message_id,
                handler = handler.name(),
                delivery_count = delivery.delivery_count,
                action = action.as_str(),
                error = %e,
                "Message processing failed"
            );
        }

        if !self.settle(channel.as_ref(), source, &delivery, action).await {
            return PollOutcome::BrokerFailed;
        }

        if action == AckAction::Requeue {
            self.start_cooldown(&source.id, delivery.delivery_count);
        }

        info!(
            source = %source.id,
            dispatch_key = %key,
            message_id = %message_id,
            action = action.as_str(),
            "Message processed"
        );
        PollOutcome::Processed { key, action }
    }

    /// Apply `action` to `delivery`. Returns false (after logging) if the broker refused.
    async fn settle(
        &self,
        channel: &dyn BrokerChannel,
        source: &PollingSource,
        delivery: &Delivery,
        action: AckAction,
    ) -> bool {
        let result = match action {
            AckAction::Ack => channel.ack(delivery).await,
            AckAction::Reject => channel.reject(delivery, false).await,
            AckAction::Requeue => channel.reject(delivery, true).await,
        };
        match result {
            Ok(()) => {
                metrics::record_processed(source.id.as_str(), action.as_str());
                true
            }
            Err(e) => {
                self.log_broker_error(source, &e);
                false
            }
        }
    }

    /// Current channel, re-created if the broker closed it.
    async fn channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let mut slot = self.channel.lock().await;
        if let Some(channel) = slot.as_ref() {
            if channel.is_open() {
                return Ok(Arc::clone(channel));
            }
            debug!(consumer_id = %self.config.consumer_id, "Channel closed, re-creating");
        }
        let channel = self.connection.create_channel().await?;
        *slot = Some(Arc::clone(&channel));
        Ok(channel)
    }

    fn is_cooling_down(&self, source_id: &str) -> bool {
        let mut cooldowns = self.cooldowns.lock();
        match cooldowns.get(source_id) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                cooldowns.remove(source_id);
                false
            }
            None => false,
        }
    }

    fn start_cooldown(&self, source_id: &str, attempt: u32) {
        let backoff = self.policy.retry().backoff(attempt);
        if backoff.is_zero() {
            return;
        }
        debug!(
            source = %source_id,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            "Source cooling down"
        );
        self.cooldowns
            .lock()
            .insert(source_id.to_string(), Instant::now() + backoff);
    }

    fn log_broker_error(&self, source: &PollingSource, e: &BrokerError) {
        error!(
            error_code = %ErrorCode::ConnectionInternalMq,
            source = %source.id,
            queue = %source.queue,
            error = %e,
            "Broker operation failed"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
