//! # Event Dispatch Scenarios
//!
//! Internal source queue → dispatch key → handler → ack / reject / requeue,
//! with the verdict observed on the broker (queue depths, dead-letter queue).

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mq_02_event_dispatcher::{
        AckAction, DispatcherConfig, HandlerRegistration, PollOutcome, PollingDispatcher,
        PollingSource, RetryPolicy,
    };
    use serde_json::json;
    use shared_bus::{BrokerChannel, InMemoryBroker};
    use shared_types::Envelope;

    use crate::integration::support::{
        relay_broker, wait_until, RecordingHandler, Reply, CONSUMER, SOURCE,
    };

    const SOURCE_QUEUE: &str = "relay.komgo-internal";
    const SOURCE_DEAD_QUEUE: &str = "relay.komgo-internal-DEAD";

    fn dispatcher(
        broker: &InMemoryBroker,
        retry: RetryPolicy,
        handlers: Vec<Arc<RecordingHandler>>,
    ) -> PollingDispatcher {
        let config = DispatcherConfig {
            consumer_id: CONSUMER.into(),
            sources: vec![PollingSource::for_consumer(CONSUMER, SOURCE)],
            polling_interval: Duration::from_millis(10),
            retry,
        };
        let registrations = handlers
            .into_iter()
            .map(|handler| HandlerRegistration::from_handler(handler))
            .collect();
        PollingDispatcher::new(config, Arc::new(broker.clone()), registrations).unwrap()
    }

    async fn publish(broker: &InMemoryBroker, routing_key: &str, payload: serde_json::Value) {
        broker
            .open_channel()
            .publish(SOURCE, Envelope::json(routing_key, &payload).unwrap())
            .await
            .unwrap();
    }

    async fn poll(dispatcher: &PollingDispatcher) -> PollOutcome {
        dispatcher.poll_once(&dispatcher.config().sources[0]).await
    }

    // =========================================================================
    // HANDLER SELECTION
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_key_rejected_without_handler_call() {
        let broker = relay_broker();
        let handler = RecordingHandler::new(&["KOMGO.Trade.TradeData"], Reply::Ok);
        let dispatcher = dispatcher(&broker, RetryPolicy::default(), vec![handler.clone()]);

        publish(&broker, "komgo.internal", json!({ "messageType": "unknown-key" })).await;

        assert_eq!(
            poll(&dispatcher).await,
            PollOutcome::NoHandler {
                key: "unknown-key".into()
            }
        );
        assert_eq!(handler.calls(), 0);
        assert_eq!(broker.queue_depth(SOURCE_QUEUE), Some(0));
        assert_eq!(broker.queue_depth(SOURCE_DEAD_QUEUE), Some(1));
    }

    #[tokio::test]
    async fn test_message_type_beats_routing_key() {
        let broker = relay_broker();
        let trade = RecordingHandler::new(&["KOMGO.Trade.TradeData"], Reply::Ok);
        let cargo = RecordingHandler::new(&["KOMGO.Trade.CargoData"], Reply::Ok);
        let dispatcher = dispatcher(
            &broker,
            RetryPolicy::default(),
            vec![trade.clone(), cargo.clone()],
        );

        publish(
            &broker,
            "KOMGO.Trade.CargoData",
            json!({ "messageType": "KOMGO.Trade.TradeData", "vaktId": "E2389423" }),
        )
        .await;
        publish(&broker, "KOMGO.Trade.CargoData", json!({ "vaktId": "E2389424" })).await;

        assert_eq!(
            poll(&dispatcher).await,
            PollOutcome::Processed {
                key: "KOMGO.Trade.TradeData".into(),
                action: AckAction::Ack
            }
        );
        assert_eq!(
            poll(&dispatcher).await,
            PollOutcome::Processed {
                key: "KOMGO.Trade.CargoData".into(),
                action: AckAction::Ack
            }
        );
        assert_eq!((trade.calls(), cargo.calls()), (1, 1));
        assert_eq!(trade.seen()[0].payload_json().unwrap()["vaktId"], "E2389423");
    }

    // =========================================================================
    // VERDICTS
    // =========================================================================

    #[tokio::test]
    async fn test_transient_failure_requeues_once_per_tick() {
        let broker = relay_broker();
        let handler = RecordingHandler::new(&["KOMGO.Trade.TradeData"], Reply::Transient);
        let dispatcher = dispatcher(&broker, RetryPolicy::default(), vec![handler.clone()]);

        publish(&broker, "KOMGO.Trade.TradeData", json!({})).await;

        let outcomes = dispatcher.poll_cycle().await;
        assert_eq!(
            outcomes,
            vec![PollOutcome::Processed {
                key: "KOMGO.Trade.TradeData".into(),
                action: AckAction::Requeue
            }]
        );
        assert_eq!(handler.calls(), 1);
        assert_eq!(broker.queue_depth(SOURCE_QUEUE), Some(1));
        assert_eq!(broker.queue_depth(SOURCE_DEAD_QUEUE), Some(0));
        assert_eq!(broker.unacked_count(), 0);
    }

    #[tokio::test]
    async fn test_each_message_gets_exactly_one_verdict() {
        let broker = relay_broker();
        let ok = RecordingHandler::new(&["ok"], Reply::Ok);
        let invalid = RecordingHandler::new(&["invalid"], Reply::Invalid);
        let transient = RecordingHandler::new(&["transient"], Reply::Transient);
        let dispatcher = dispatcher(
            &broker,
            RetryPolicy::default(),
            vec![ok.clone(), invalid.clone(), transient.clone()],
        );

        for key in ["ok", "invalid", "transient"] {
            publish(&broker, key, json!({})).await;
        }

        let mut actions = Vec::new();
        for _ in 0..3 {
            match poll(&dispatcher).await {
                PollOutcome::Processed { action, .. } => actions.push(action),
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(
            actions,
            vec![AckAction::Ack, AckAction::Reject, AckAction::Requeue]
        );
        assert_eq!((ok.calls(), invalid.calls(), transient.calls()), (1, 1, 1));
        // acked: gone; rejected: dead-lettered; requeued: back on the queue
        assert_eq!(broker.queue_depth(SOURCE_QUEUE), Some(1));
        assert_eq!(broker.queue_depth(SOURCE_DEAD_QUEUE), Some(1));
        assert_eq!(broker.unacked_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_ceiling_dead_letters() {
        let broker = relay_broker();
        let handler = RecordingHandler::new(&["KOMGO.Trade.TradeData"], Reply::Transient);
        let retry = RetryPolicy {
            max_attempts: Some(3),
            ..RetryPolicy::default()
        };
        let dispatcher = dispatcher(&broker, retry, vec![handler.clone()]);

        publish(&broker, "KOMGO.Trade.TradeData", json!({ "vaktId": "E1" })).await;

        let mut actions = Vec::new();
        for _ in 0..3 {
            if let PollOutcome::Processed { action, .. } = poll(&dispatcher).await {
                actions.push(action);
            }
        }
        assert_eq!(
            actions,
            vec![AckAction::Requeue, AckAction::Requeue, AckAction::Reject]
        );
        assert_eq!(poll(&dispatcher).await, PollOutcome::Empty);
        assert_eq!(handler.calls(), 3);

        let dead = broker
            .open_channel()
            .get(SOURCE_DEAD_QUEUE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dead.envelope.routing_key, "KOMGO.Trade.TradeData");
    }

    // =========================================================================
    // POLLING LOOP
    // =========================================================================

    #[tokio::test]
    async fn test_running_dispatcher_drains_source() {
        let broker = relay_broker();
        let handler = RecordingHandler::new(&["KOMGO.Trade.TradeData"], Reply::Ok);
        let dispatcher = Arc::new(dispatcher(
            &broker,
            RetryPolicy::default(),
            vec![handler.clone()],
        ));

        for id in 0..3 {
            publish(&broker, "KOMGO.Trade.TradeData", json!({ "vaktId": id })).await;
        }

        dispatcher.start();
        wait_until(|| handler.calls() == 3).await;
        dispatcher.stop().await;

        assert!(!dispatcher.is_running());
        assert_eq!(broker.queue_depth(SOURCE_QUEUE), Some(0));
        assert_eq!(broker.unacked_count(), 0);
    }
}
