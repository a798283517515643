//! Acknowledgment policy
//!
//! ```text
//! Ok(())                          ──→ Ack
//! Err(InvalidMessage)             ──→ Reject
//! Err(other), attempts left       ──→ Requeue
//! Err(other), attempts exhausted  ──→ Reject (dead-letter path)
//! ```
//!
//! With the default [`RetryPolicy`] attempts are never exhausted, so every
//! transient failure is requeued.

use std::time::Duration;

use crate::error::HandlerError;

/// Broker verdict for a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckAction {
    Ack,
    Reject,
    Requeue,
}

impl AckAction {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AckAction::Ack => "ack",
            AckAction::Reject => "reject",
            AckAction::Requeue => "requeue",
        }
    }
}

/// Retry ceiling and per-source cooldown after a requeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deliveries after which a transient failure is rejected. `None` = unbounded.
    pub max_attempts: Option<u32>,
    /// Cooldown after the first requeue. Zero disables cooldown.
    pub base_backoff: Duration,
    /// Upper bound of the cooldown.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Requeue forever, no cooldown.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if a message delivered `delivery_count` times may not be requeued again.
    #[must_use]
    pub fn is_exhausted(&self, delivery_count: u32) -> bool {
        self.max_attempts
            .map_or(false, |max_attempts| delivery_count >= max_attempts)
    }

    /// Cooldown after the requeue of attempt `attempt` (1-based):
    /// `min(base * 2^(attempt-1), max)`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.base_backoff.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |backoff| backoff.min(self.max_backoff))
    }
}

/// Classifies handler results into broker verdicts.
#[derive(Debug, Clone, Default)]
pub struct AckPolicy {
    retry: RetryPolicy,
}

impl AckPolicy {
    #[must_use]
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Verdict for `result` on a message delivered `delivery_count` times.
    #[must_use]
    pub fn classify(&self, result: &Result<(), HandlerError>, delivery_count: u32) -> AckAction {
        match result {
            Ok(()) => AckAction::Ack,
            Err(e) if e.is_invalid_message() => AckAction::Reject,
            Err(_) if self.retry.is_exhausted(delivery_count) => AckAction::Reject,
            Err(_) => AckAction::Requeue,
        }
    }
}
