//! # Relay Runtime
//!
//! Wires the two subsystems onto one broker:
//!
//! 1. Declare the topology
//! 2. Spawn one inbound consumer per partner
//! 3. Start the polling dispatcher over the internal sources
//!
//! Shutdown runs in reverse: inbound consumers first so nothing new enters,
//! then the dispatcher finishes its current tick and closes its channel.

use std::sync::Arc;

use mq_01_inbound_router::{InboundConsumer, InboundConsumerConfig, InboundError, InboundRouter};
use mq_02_event_dispatcher::{
    DispatchError, DispatcherConfig, HandlerRegistration, PollingDispatcher, PollingSource,
};
use mq_telemetry::set_components_running;
use shared_bus::{BrokerConnection, BrokerError, InMemoryBroker};
use shared_types::topology;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::handlers::AuditLogHandler;
use crate::topology::declare_topology;

/// Runtime lifecycle errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Runtime already started")]
    AlreadyStarted,

    #[error("Topology declaration failed: {0}")]
    Topology(#[from] BrokerError),

    #[error("Dispatcher setup failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Inbound consumer failed: {0}")]
    Inbound(#[from] InboundError),
}

/// The message relay: inbound routers plus the internal dispatcher.
pub struct RelayRuntime {
    instance_id: Uuid,
    config: RuntimeConfig,
    broker: InMemoryBroker,
    consumers: Vec<InboundConsumer>,
    dispatcher: Option<Arc<PollingDispatcher>>,
    started: bool,
}

impl RelayRuntime {
    /// Runtime over a fresh in-process broker.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_broker(config, InMemoryBroker::new())
    }

    /// Runtime over an existing broker, shared with publishers in the same process.
    pub fn with_broker(config: RuntimeConfig, broker: InMemoryBroker) -> Self {
        let instance_id = Uuid::new_v4();
        info!(instance_id = %instance_id, broker_uri = %config.broker_uri, "Creating relay runtime");
        Self {
            instance_id,
            config,
            broker,
            consumers: Vec::new(),
            dispatcher: None,
            started: false,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn broker(&self) -> &InMemoryBroker {
        &self.broker
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Option<&Arc<PollingDispatcher>> {
        self.dispatcher.as_ref()
    }

    /// Partners with a running inbound consumer.
    pub fn partners(&self) -> Vec<&str> {
        self.consumers.iter().map(InboundConsumer::partner).collect()
    }

    /// Registrations built from configuration alone.
    pub fn default_registrations(config: &RuntimeConfig) -> Vec<HandlerRegistration> {
        if config.audit_keys.is_empty() {
            return Vec::new();
        }
        let audit = Arc::new(AuditLogHandler::new(config.audit_keys.clone()));
        vec![HandlerRegistration::from_handler(audit)]
    }

    /// Declare topology and start every component.
    ///
    /// The dispatcher is only started when there are sources and at least
    /// one handler; a dispatcher without handlers would dead-letter all
    /// internal traffic.
    pub fn start(&mut self, registrations: Vec<HandlerRegistration>) -> Result<(), RuntimeError> {
        if self.started {
            return Err(RuntimeError::AlreadyStarted);
        }

        info!("===========================================");
        info!("  MQ Relay v{}", env!("CARGO_PKG_VERSION"));
        info!("  instance: {}", self.instance_id);
        info!("===========================================");

        declare_topology(&self.broker, &self.config)?;

        let dispatcher = if self.config.sources.is_empty() || registrations.is_empty() {
            warn!(
                sources = self.config.sources.len(),
                handlers = registrations.len(),
                "Dispatcher not started"
            );
            None
        } else {
            let config = DispatcherConfig {
                consumer_id: self.config.consumer_id.clone(),
                sources: self
                    .config
                    .sources
                    .iter()
                    .map(|source| PollingSource::for_consumer(&self.config.consumer_id, source))
                    .collect(),
                polling_interval: self.config.polling_interval,
                retry: self.config.retry.clone(),
            };
            Some(Arc::new(PollingDispatcher::new(
                config,
                self.connection(),
                registrations,
            )?))
        };

        for partner in &self.config.partners {
            let mut consumer_config =
                InboundConsumerConfig::new(topology::partner_inbound_queue(partner));
            consumer_config.reconnect_delay = self.config.reconnect_delay;
            let consumer = InboundConsumer::spawn(
                self.connection(),
                InboundRouter::new(partner.clone()),
                consumer_config,
            );
            self.consumers.push(consumer);
        }

        if let Some(dispatcher) = &dispatcher {
            dispatcher.start();
        }
        self.dispatcher = dispatcher;
        self.started = true;

        set_components_running("inbound", self.consumers.len());
        set_components_running("dispatcher", usize::from(self.dispatcher.is_some()));
        info!(
            partners = ?self.config.partners,
            dispatcher = self.dispatcher.is_some(),
            "Relay running"
        );
        Ok(())
    }

    /// Stop every component. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");

        for consumer in self.consumers.drain(..) {
            let partner = consumer.partner().to_string();
            if let Err(e) = consumer.stop().await {
                error!(partner = %partner, error = %e, "Inbound consumer did not stop cleanly");
            }
        }
        set_components_running("inbound", 0);

        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.stop().await;
        }
        set_components_running("dispatcher", 0);

        info!("Shutdown complete");
    }

    fn connection(&self) -> Arc<dyn BrokerConnection> {
        Arc::new(self.broker.clone())
    }
}
