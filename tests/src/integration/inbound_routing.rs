//! # Inbound Routing Scenarios
//!
//! Partner queue → header validation → destination check → forward + ack,
//! driven through real in-memory broker channels.
//!
//! ## Flows Tested
//!
//! 1. Missing routing headers are dead-lettered and never forwarded
//! 2. Valid messages reach the recipient queue with provenance attached
//! 3. An unknown recipient kills the channel; the redelivery is drained once
//! 4. The supervised consumer recovers on its own

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mq_01_inbound_router::{InboundConsumer, InboundConsumerConfig, InboundRouter, RouteOutcome};
    use shared_bus::{BrokerChannel, InMemoryBroker, InMemoryChannel};
    use uuid::Uuid;

    use shared_types::{
        Envelope, INTERNAL_ROUTING_KEY, RECIPIENT_ID_HEADER, SENDER_ID_HEADER,
        SENDER_PLATFORM_HEADER,
    };

    use crate::integration::support::{addressed, relay_broker, wait_until, PARTNER, RECIPIENT};

    const INBOUND_EXCHANGE: &str = "VAKT-INBOUND-EXCHANGE";
    const INBOUND_QUEUE: &str = "VAKT-INBOUND-QUEUE";
    const INBOUND_DEAD_QUEUE: &str = "VAKT-INBOUND-QUEUE-DEAD";
    const RECIPIENT_QUEUE: &str = "RECIPIENT-QUEUE";

    async fn publish(broker: &InMemoryBroker, envelope: Envelope) {
        broker
            .open_channel()
            .publish(INBOUND_EXCHANGE, envelope)
            .await
            .unwrap();
    }

    async fn route_next(
        router: &mut InboundRouter,
        channel: &InMemoryChannel,
    ) -> RouteOutcome {
        let delivery = channel.get(INBOUND_QUEUE).await.unwrap().expect("pending message");
        router.route(channel, Some(delivery)).await
    }

    // =========================================================================
    // HEADER VALIDATION
    // =========================================================================

    #[tokio::test]
    async fn test_empty_headers_dead_lettered() {
        let broker = relay_broker();
        publish(&broker, Envelope::new("", "hello world")).await;

        let channel = broker.open_channel();
        let mut router = InboundRouter::new(PARTNER);
        assert_eq!(route_next(&mut router, &channel).await, RouteOutcome::InvalidHeaders);

        assert_eq!(broker.queue_depth(INBOUND_QUEUE), Some(0));
        assert_eq!(broker.queue_depth(INBOUND_DEAD_QUEUE), Some(1));
        assert_eq!(broker.queue_depth(RECIPIENT_QUEUE), Some(0));
        assert!(channel.is_open());
    }

    #[tokio::test]
    async fn test_any_missing_routing_header_is_rejected() {
        let incomplete = [
            Envelope::new("", "x").with_header(SENDER_ID_HEADER, "SOME_SENDER"),
            Envelope::new("", "x").with_header(RECIPIENT_ID_HEADER, RECIPIENT),
            Envelope::new("", "x")
                .with_header(SENDER_ID_HEADER, "")
                .with_header(RECIPIENT_ID_HEADER, RECIPIENT),
            Envelope::new("", "x")
                .with_header(SENDER_ID_HEADER, "SOME_SENDER")
                .with_header(RECIPIENT_ID_HEADER, ""),
        ];
        let count = incomplete.len();

        let broker = relay_broker();
        for envelope in incomplete {
            publish(&broker, envelope).await;
        }

        let channel = broker.open_channel();
        let mut router = InboundRouter::new(PARTNER);
        for _ in 0..count {
            assert_eq!(route_next(&mut router, &channel).await, RouteOutcome::InvalidHeaders);
        }

        assert_eq!(broker.queue_depth(INBOUND_DEAD_QUEUE), Some(count));
        assert_eq!(broker.queue_depth(RECIPIENT_QUEUE), Some(0));
        assert!(!router.fault_memory().is_armed());
    }

    // =========================================================================
    // FORWARDING
    // =========================================================================

    #[tokio::test]
    async fn test_valid_message_reaches_recipient() {
        let broker = relay_broker();
        let message_id = Uuid::new_v4().to_string();
        publish(
            &broker,
            addressed(RECIPIENT, "hello world").with_message_id(message_id.clone()),
        )
        .await;

        let channel = broker.open_channel();
        let mut router = InboundRouter::new(PARTNER);
        assert_eq!(
            route_next(&mut router, &channel).await,
            RouteOutcome::Routed {
                exchange: "RECIPIENT-EXCHANGE".into()
            }
        );
        assert_eq!(broker.queue_depth(INBOUND_QUEUE), Some(0));
        assert_eq!(broker.unacked_count(), 0);

        let forwarded = channel.get(RECIPIENT_QUEUE).await.unwrap().unwrap().envelope;
        assert_eq!(forwarded.routing_key, INTERNAL_ROUTING_KEY);
        assert_eq!(forwarded.header(SENDER_PLATFORM_HEADER), Some("vakt"));
        assert_eq!(forwarded.header(SENDER_ID_HEADER), Some("SOME_SENDER"));
        assert_eq!(forwarded.header(RECIPIENT_ID_HEADER), Some(RECIPIENT));
        assert_eq!(forwarded.payload, b"hello world".to_vec());
        assert_eq!(forwarded.message_id, Some(message_id));
    }

    #[tokio::test]
    async fn test_forward_keeps_extra_headers_and_replaces_routing_key() {
        let broker = relay_broker();
        let mut original = addressed(RECIPIENT, "{}").with_header("x-correlation-id", "c-1");
        original.routing_key = "vakt.trade.update".into();
        publish(&broker, original.clone()).await;

        let channel = broker.open_channel();
        let mut router = InboundRouter::new(PARTNER);
        assert!(route_next(&mut router, &channel).await.is_settled());

        let forwarded = channel.get(RECIPIENT_QUEUE).await.unwrap().unwrap().envelope;
        assert_eq!(forwarded.routing_key, INTERNAL_ROUTING_KEY);
        for (name, value) in &original.headers {
            assert_eq!(forwarded.header(name), Some(value.as_str()), "{name}");
        }
        assert_eq!(forwarded.headers.len(), original.headers.len() + 1);
    }

    // =========================================================================
    // FAULT RECOVERY
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_recipient_drains_one_message_then_recovers() {
        let broker = relay_broker();
        publish(&broker, addressed("INVALID_RECIPIENT", "m1")).await;
        publish(&broker, addressed(RECIPIENT, "m2")).await;
        publish(&broker, addressed(RECIPIENT, "m3")).await;

        let mut router = InboundRouter::new(PARTNER);

        // No verdict, the broker closes the channel and requeues m1
        let first = broker.open_channel();
        assert_eq!(route_next(&mut router, &first).await, RouteOutcome::ResolutionFailed);
        assert!(!first.is_open());
        assert!(router.fault_memory().is_armed());
        assert_eq!(broker.queue_depth(INBOUND_QUEUE), Some(3));

        let second = broker.open_channel();
        let redelivered = second.get(INBOUND_QUEUE).await.unwrap().unwrap();
        assert!(redelivered.redelivered);
        assert_eq!(redelivered.envelope.payload, b"m1".to_vec());
        assert_eq!(
            router.route(&second, Some(redelivered)).await,
            RouteOutcome::DrainedAfterFault
        );
        assert!(!router.fault_memory().is_armed());

        for _ in 0..2 {
            assert!(matches!(
                route_next(&mut router, &second).await,
                RouteOutcome::Routed { .. }
            ));
        }

        assert_eq!(broker.queue_depth(INBOUND_DEAD_QUEUE), Some(1));
        assert_eq!(broker.queue_depth(RECIPIENT_QUEUE), Some(2));
        assert_eq!(broker.queue_depth(INBOUND_QUEUE), Some(0));
    }

    #[tokio::test]
    async fn test_cancellation_leaves_state_untouched() {
        let broker = relay_broker();
        let channel = broker.open_channel();
        let mut router = InboundRouter::new(PARTNER);

        assert_eq!(router.route(&channel, None).await, RouteOutcome::Cancelled);
        assert!(!router.fault_memory().is_armed());
        assert!(channel.is_open());
    }

    // =========================================================================
    // SUPERVISED CONSUMER
    // =========================================================================

    #[tokio::test]
    async fn test_consumer_survives_unknown_recipient() {
        let broker = relay_broker();
        let mut config = InboundConsumerConfig::new(INBOUND_QUEUE);
        config.reconnect_delay = Duration::from_millis(10);
        let consumer = InboundConsumer::spawn(
            Arc::new(broker.clone()),
            InboundRouter::new(PARTNER),
            config,
        );

        publish(&broker, addressed("INVALID_RECIPIENT", "lost")).await;
        wait_until(|| broker.queue_depth(INBOUND_DEAD_QUEUE) == Some(1)).await;

        publish(&broker, addressed(RECIPIENT, "delivered")).await;
        wait_until(|| broker.queue_depth(RECIPIENT_QUEUE) == Some(1)).await;

        let router = consumer.stop().await.unwrap();
        assert!(!router.fault_memory().is_armed());
    }
}
