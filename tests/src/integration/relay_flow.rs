//! # Relay Flow
//!
//! Both subsystems started by the runtime on one broker:
//!
//! ```text
//! VAKT-INBOUND-EXCHANGE → router → RECIPIENT-EXCHANGE ─┬→ RECIPIENT-QUEUE
//!                                                      └→ relay.komgo-internal → dispatcher → handler
//! ```

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use mq_02_event_dispatcher::HandlerRegistration;
    use relay_runtime::{RelayRuntime, RuntimeConfig};
    use serde_json::json;
    use shared_bus::{BrokerChannel, InMemoryBroker};
    use shared_types::{Envelope, INTERNAL_ROUTING_KEY, SENDER_PLATFORM_HEADER};

    use crate::integration::support::{addressed, wait_until, RecordingHandler, Reply, RECIPIENT};

    fn config() -> RuntimeConfig {
        let vars: HashMap<&str, &str> = [
            ("MQ_PARTNERS", "VAKT"),
            ("MQ_RECIPIENTS", RECIPIENT),
            ("MQ_SOURCES", "komgo-internal"),
            ("MQ_POLLING_INTERVAL_MS", "10"),
            ("MQ_RECONNECT_DELAY_MS", "10"),
            ("MQ_AUDIT_KEYS", "KOMGO.Audit"),
        ]
        .into_iter()
        .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
    }

    /// Runtime whose source queue also receives everything sent to the recipient.
    fn runtime(registrations: Vec<HandlerRegistration>) -> RelayRuntime {
        let broker = InMemoryBroker::new();
        let mut runtime = RelayRuntime::with_broker(config(), broker.clone());
        runtime.start(registrations).unwrap();
        broker
            .bind_queue("relay.komgo-internal", "RECIPIENT-EXCHANGE", "")
            .unwrap();
        runtime
    }

    #[tokio::test]
    async fn test_partner_message_dispatched_to_handler() {
        let handler = RecordingHandler::new(&["KOMGO.Trade.TradeData"], Reply::Ok);
        let mut runtime = runtime(vec![HandlerRegistration::from_handler(handler.clone())]);
        let broker = runtime.broker().clone();

        let content = json!({ "messageType": "KOMGO.Trade.TradeData", "vaktId": "E2389423" });
        broker
            .open_channel()
            .publish(
                "VAKT-INBOUND-EXCHANGE",
                addressed(RECIPIENT, &content.to_string()),
            )
            .await
            .unwrap();

        wait_until(|| handler.calls() == 1).await;
        runtime.shutdown().await;

        let seen = handler.seen();
        assert_eq!(seen[0].routing_key, INTERNAL_ROUTING_KEY);
        assert_eq!(seen[0].header(SENDER_PLATFORM_HEADER), Some("vakt"));
        assert_eq!(seen[0].payload_json(), Some(content));
        assert_eq!(broker.queue_depth("RECIPIENT-QUEUE"), Some(1));
        assert_eq!(broker.queue_depth("relay.komgo-internal"), Some(0));
    }

    #[tokio::test]
    async fn test_audit_handler_rejects_non_json() {
        let registrations = RelayRuntime::default_registrations(&config());
        let mut runtime = runtime(registrations);
        let broker = runtime.broker().clone();

        broker
            .open_channel()
            .publish("komgo-internal", Envelope::new("KOMGO.Audit", "not json"))
            .await
            .unwrap();

        wait_until(|| broker.queue_depth("relay.komgo-internal-DEAD") == Some(1)).await;
        runtime.shutdown().await;
        assert_eq!(broker.queue_depth("relay.komgo-internal"), Some(0));
    }

    #[tokio::test]
    async fn test_invalid_partner_message_never_reaches_dispatcher() {
        let handler = RecordingHandler::new(&[INTERNAL_ROUTING_KEY], Reply::Ok);
        let mut runtime = runtime(vec![HandlerRegistration::from_handler(handler.clone())]);
        let broker = runtime.broker().clone();

        broker
            .open_channel()
            .publish("VAKT-INBOUND-EXCHANGE", Envelope::new("", "hello world"))
            .await
            .unwrap();

        wait_until(|| broker.queue_depth("VAKT-INBOUND-QUEUE-DEAD") == Some(1)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        runtime.shutdown().await;

        assert_eq!(handler.calls(), 0);
        assert_eq!(broker.queue_depth("RECIPIENT-QUEUE"), Some(0));
    }
}
