//! Shared fixtures for the integration scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mq_02_event_dispatcher::{EventHandler, HandlerError};
use parking_lot::Mutex;
use relay_runtime::topology::{declare_partner, declare_recipient, declare_source};
use shared_bus::InMemoryBroker;
use shared_types::{Envelope, RECIPIENT_ID_HEADER, SENDER_ID_HEADER};

pub const PARTNER: &str = "VAKT";
pub const RECIPIENT: &str = "RECIPIENT";
pub const CONSUMER: &str = "relay";
pub const SOURCE: &str = "komgo-internal";

/// Broker with the VAKT partner, one recipient and one internal source declared.
pub fn relay_broker() -> InMemoryBroker {
    let broker = InMemoryBroker::new();
    declare_partner(&broker, PARTNER).unwrap();
    declare_recipient(&broker, RECIPIENT).unwrap();
    declare_source(&broker, CONSUMER, SOURCE).unwrap();
    broker
}

/// Partner message addressed to `recipient`.
pub fn addressed(recipient: &str, content: &str) -> Envelope {
    Envelope::new("", content)
        .with_header(SENDER_ID_HEADER, "SOME_SENDER")
        .with_header(RECIPIENT_ID_HEADER, recipient)
}

/// Poll `check` until it holds, for at most one second.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

/// What the recording handler answers.
#[derive(Clone, Copy, Debug)]
pub enum Reply {
    Ok,
    Invalid,
    Transient,
}

/// Handler that records every envelope it sees and answers with a fixed reply.
pub struct RecordingHandler {
    keys: Vec<String>,
    reply: Reply,
    calls: AtomicUsize,
    seen: Mutex<Vec<Envelope>>,
}

impl RecordingHandler {
    pub fn new(keys: &[&str], reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Envelope> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn keys_to_process(&self) -> Vec<String> {
        self.keys.clone()
    }

    async fn process_event(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(envelope.clone());
        match self.reply {
            Reply::Ok => Ok(()),
            Reply::Invalid => Err(HandlerError::InvalidMessage("unparseable".into())),
            Reply::Transient => Err(HandlerError::Transient("store unavailable".into())),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}
