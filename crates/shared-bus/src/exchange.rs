//! # Exchanges and Bindings
//!
//! Routing rules of the in-memory broker.

/// How an exchange selects the queues a message is copied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Every bound queue, routing key ignored.
    Fanout,
    /// Queues whose binding key equals the routing key.
    Direct,
    /// Queues whose binding pattern matches the routing key.
    /// `*` matches exactly one word, `#` matches zero or more words.
    Topic,
}

/// A queue bound to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Destination queue.
    pub queue: String,
    /// Binding key or topic pattern.
    pub key: String,
}

impl Binding {
    /// Create a binding.
    #[must_use]
    pub fn new(queue: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            key: key.into(),
        }
    }

    /// Check if a message with `routing_key` follows this binding.
    #[must_use]
    pub fn matches(&self, kind: ExchangeKind, routing_key: &str) -> bool {
        match kind {
            ExchangeKind::Fanout => true,
            ExchangeKind::Direct => self.key == routing_key,
            ExchangeKind::Topic => topic_matches(&self.key, routing_key),
        }
    }
}

/// Match a dot-delimited routing key against a topic pattern.
#[must_use]
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = if routing_key.is_empty() {
        Vec::new()
    } else {
        routing_key.split('.').collect()
    };
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => {
            // `#` swallows 0..=len words
            (0..=key.len()).any(|skip| match_words(rest, &key[skip..]))
        }
        Some((&word, rest)) => match key.split_first() {
            Some((&first, key_rest)) => (word == "*" || word == first) && match_words(rest, key_rest),
            None => false,
        },
    }
}
