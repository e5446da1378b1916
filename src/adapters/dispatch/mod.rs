//! HandlerRegistry - event-type to business-handler dispatch table.
//!
//! Implements the EventProcessor port as a lookup table: one EventHandler
//! per event type, registered at startup. An event type with no handler is
//! a handler failure, so unrecognized types surface through the normal
//! retry-and-alert path instead of silently completing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{EventHandler, EventProcessor, HandlerError};

/// Error code reported when no handler is registered for an event type.
pub const UNHANDLED_EVENT_TYPE: &str = "UNHANDLED_EVENT_TYPE";

/// Lookup table from event type to business handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for an event type, replacing any previous one.
    pub fn register(mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.insert(event_type.into(), handler);
        self
    }

    /// Returns true if a handler is registered for the event type.
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }
}

#[async_trait]
impl EventProcessor for HandlerRegistry {
    async fn process(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), HandlerError> {
        match self.handlers.get(event_type) {
            Some(handler) => handler.handle(payload).await,
            None => Err(HandlerError::new(
                UNHANDLED_EVENT_TYPE,
                format!("No handler registered for event type '{}'", event_type),
            )),
        }
    }
}
