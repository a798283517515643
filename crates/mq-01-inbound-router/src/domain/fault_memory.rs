//! Fault memory
//!
//! Broker clients report a closed channel from the NEXT operation, not from
//! the one that broke it. After a failed resolution the router cannot settle
//! the failing message, so it remembers that the next delivery must be
//! rejected instead.
//!
//! ```text
//! [CLEAR] ──arm()──→ [ARMED] ──take() == true──→ [CLEAR]
//!    └──take() == false──┘
//! ```
//!
//! At most one message is owed a rejection at any time.

/// Single-slot "previous message was faulty" flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultMemory {
    last_was_faulty: bool,
}

impl FaultMemory {
    /// Clear fault memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the current message caused a resolution failure.
    pub fn arm(&mut self) {
        self.last_was_faulty = true;
    }

    /// Consume the owed rejection, if any. Returns true exactly once per `arm`.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.last_was_faulty)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.last_was_faulty
    }
}
