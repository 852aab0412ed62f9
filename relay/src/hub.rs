use crate::connection::{ConnectionHandle, ConnectionRegistry};
use crate::message::{self, Payload};
use events::Message;
use log::*;
use tokio::sync::mpsc::Sender;

/// Process-wide subscription hub. Construct one at startup and share it by
/// `Arc` with the websocket bootstrap and with message producers.
pub struct Hub {
    registry: ConnectionRegistry,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
        }
    }

    /// Subscribe a connection to its conversation. Publishes that happen after
    /// this returns reach `sender`'s queue.
    pub fn register(&self, handle: &ConnectionHandle, sender: Sender<Payload>) {
        self.registry.register(handle, sender);
        info!(
            "Registered connection {} for conversation {} (subscriber: {})",
            handle.id.as_str(),
            handle.conversation_id,
            handle.subscriber_id
        );
    }

    /// Unsubscribe a connection and close its outbound queue. Safe to call any
    /// number of times; only the first call for a registered connection has an effect.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let removed = self.registry.unregister(handle);
        if removed {
            info!(
                "Unregistered connection {} from conversation {} (subscriber: {})",
                handle.id.as_str(),
                handle.conversation_id,
                handle.subscriber_id
            );
        }
        removed
    }

    /// Deliver `message` to every live subscriber of `conversation_id`.
    ///
    /// Never blocks and never fails from the caller's point of view: the message
    /// is encoded once, subscribers with a full queue are evicted, and a
    /// conversation without subscribers simply drops the message.
    pub fn publish(&self, conversation_id: &str, message: &Message) {
        let payload = match message::encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize message {}: {e}", message.id);
                return;
            }
        };

        let delivery = self.registry.send_to_conversation(conversation_id, &payload);

        for handle in &delivery.evicted {
            warn!(
                "Evicted connection {} from conversation {} (subscriber: {}): outbound queue full or closed",
                handle.id.as_str(),
                handle.conversation_id,
                handle.subscriber_id
            );
        }

        if delivery.delivered == 0 && delivery.evicted.is_empty() {
            debug!(
                "No live subscribers for conversation {conversation_id}; message {} not relayed",
                message.id
            );
        } else {
            trace!(
                "Relayed message {} to {} connection(s) in conversation {conversation_id}",
                message.id,
                delivery.delivered
            );
        }
    }

    pub fn is_registered(&self, handle: &ConnectionHandle) -> bool {
        self.registry.contains(handle)
    }

    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.registry.subscriber_count(conversation_id)
    }

    pub fn conversation_count(&self) -> usize {
        self.registry.conversation_count()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
