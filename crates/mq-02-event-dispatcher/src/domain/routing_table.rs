//! Routing table
//!
//! Maps a dispatch key to exactly one handler. Built once at startup from an
//! explicit registration list and read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::ports::EventHandler;

/// Keys claimed by one handler.
#[derive(Clone)]
pub struct HandlerRegistration {
    pub keys: Vec<String>,
    pub handler: Arc<dyn EventHandler>,
}

impl HandlerRegistration {
    /// Register `handler` for an explicit key set.
    #[must_use]
    pub fn new<K: Into<String>>(keys: impl IntoIterator<Item = K>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            handler,
        }
    }

    /// Register `handler` for the keys it declares itself.
    #[must_use]
    pub fn from_handler(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            keys: handler.keys_to_process(),
            handler,
        }
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("keys", &self.keys)
            .field("handler", &self.handler.name())
            .finish()
    }
}

struct Entry {
    registration: usize,
    handler: Arc<dyn EventHandler>,
}

/// Key → handler lookup.
#[derive(Default)]
pub struct RoutingTable {
    entries: HashMap<String, Entry>,
}

impl RoutingTable {
    /// Build the table from explicit registrations.
    ///
    /// A key claimed by two registrations, or an empty key, is a startup error.
    /// A registration repeating one of its own keys is harmless.
    pub fn build(registrations: Vec<HandlerRegistration>) -> DispatchResult<Self> {
        let mut entries: HashMap<String, Entry> = HashMap::new();

        for (index, registration) in registrations.into_iter().enumerate() {
            for key in registration.keys {
                if key.is_empty() {
                    return Err(DispatchError::EmptyKey {
                        handler: registration.handler.name().to_string(),
                    });
                }
                if let Some(existing) = entries.get(&key) {
                    if existing.registration == index {
                        continue;
                    }
                    return Err(DispatchError::DuplicateKey {
                        key,
                        first: existing.handler.name().to_string(),
                        second: registration.handler.name().to_string(),
                    });
                }
                entries.insert(
                    key,
                    Entry {
                        registration: index,
                        handler: Arc::clone(&registration.handler),
                    },
                );
            }
        }

        Ok(Self { entries })
    }

    /// Build the table from the keys each handler declares.
    pub fn from_handlers(handlers: Vec<Arc<dyn EventHandler>>) -> DispatchResult<Self> {
        Self::build(handlers.into_iter().map(HandlerRegistration::from_handler).collect())
    }

    /// Handler owning `key`.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Arc<dyn EventHandler>> {
        self.entries.get(key).map(|entry| &entry.handler)
    }

    /// All registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("keys", &self.keys())
            .finish()
    }
}
