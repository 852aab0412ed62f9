//! Event system infrastructure for the chat relay.
//!
//! This crate provides the event system that decouples message producers
//! (HTTP handlers, AI response generation, anything that persists a chat
//! message) from live delivery concerns (the websocket relay).
//!
//! # Architecture
//!
//! - **Message**: An already-persisted chat message, the unit of fan-out
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies between producers and the relay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of the conversation a message belongs to and that live
/// subscribers address.
pub type ConversationId = String;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Ai,
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SenderRole::User => write!(f, "user"),
            SenderRole::Ai => write!(f, "ai"),
        }
    }
}

/// A chat message handed over for live delivery.
///
/// Messages are persisted by the external store before they reach the relay
/// and are treated as immutable from then on. The serialized form is what
/// subscribers receive on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: ConversationId,
    pub sender: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Domain events that represent business-level changes in the system.
/// These events are emitted after the owning operation has completed
/// successfully (i.e. after the message was stored).
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Emitted when a new chat message has been stored, whether it came from
    /// the user or was generated as an AI reply.
    /// Triggers live fan-out to every connection subscribed to the conversation.
    MessageCreated {
        /// Conversation whose live subscribers receive the message.
        conversation_id: ConversationId,
        /// The stored message, serialized once per publish by the relay.
        message: Message,
    },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like live fan-out,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, sequentially.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
