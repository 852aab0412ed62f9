use crate::message::Payload;
use dashmap::DashMap;
use log::*;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

pub use events::ConversationId;

/// Opaque, already-authenticated identity of whoever opened a connection.
/// Only used for logging and attribution.
pub type SubscriberId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the registry needs to know about a connection besides its
/// outbound queue. A connection is bound to one conversation for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub conversation_id: ConversationId,
    pub subscriber_id: SubscriberId,
}

impl ConnectionHandle {
    pub fn new(conversation_id: ConversationId, subscriber_id: SubscriberId) -> Self {
        Self {
            id: ConnectionId::new(),
            conversation_id,
            subscriber_id,
        }
    }
}

/// Registry-side half of a subscription. Owns the only sender of the
/// connection's outbound queue, so dropping it closes the queue.
#[derive(Debug)]
struct Subscriber {
    subscriber_id: SubscriberId,
    sender: Sender<Payload>,
}

/// Outcome of delivering one payload to a conversation.
#[derive(Debug, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub evicted: Vec<ConnectionHandle>,
}

/// Subscription registry keyed by conversation.
///
/// Each conversation's subscriber set is only touched while holding that key's
/// exclusive guard, so registrations, removals and deliveries for the same
/// conversation are applied one at a time in the order they acquire it. A
/// conversation key only exists while it has at least one subscriber.
pub struct ConnectionRegistry {
    conversations: DashMap<ConversationId, HashMap<ConnectionId, Subscriber>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
        }
    }

    /// Add a connection to its conversation's subscriber set.
    pub fn register(&self, handle: &ConnectionHandle, sender: Sender<Payload>) {
        let replaced = self
            .conversations
            .entry(handle.conversation_id.clone())
            .or_default()
            .insert(
                handle.id.clone(),
                Subscriber {
                    subscriber_id: handle.subscriber_id.clone(),
                    sender,
                },
            );

        if replaced.is_some() {
            warn!(
                "Connection {} was already registered; replaced its outbound queue",
                handle.id.as_str()
            );
        }
    }

    /// Remove a connection, closing its outbound queue.
    ///
    /// Returns `false` when the connection was not registered, which makes
    /// repeated or racing calls harmless.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let removed = match self.conversations.get_mut(&handle.conversation_id) {
            Some(mut subscribers) => subscribers.remove(&handle.id),
            None => None,
        };

        if removed.is_some() {
            self.remove_if_empty(&handle.conversation_id);
        }

        // `removed` drops here, closing the queue once, outside the shard guard
        removed.is_some()
    }

    /// Enqueue `payload` for every subscriber of `conversation_id` without waiting.
    ///
    /// Subscribers whose queue is full or whose write loop is gone are removed
    /// in the same critical section and do not receive the payload.
    pub fn send_to_conversation(&self, conversation_id: &str, payload: &Payload) -> Delivery {
        let mut delivery = Delivery::default();

        let now_empty = match self.conversations.get_mut(conversation_id) {
            Some(mut subscribers) => {
                subscribers.retain(|connection_id, subscriber| {
                    match subscriber.sender.try_send(payload.clone()) {
                        Ok(()) => {
                            delivery.delivered += 1;
                            true
                        }
                        Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                            delivery.evicted.push(ConnectionHandle {
                                id: connection_id.clone(),
                                conversation_id: conversation_id.to_string(),
                                subscriber_id: subscriber.subscriber_id.clone(),
                            });
                            false
                        }
                    }
                });
                subscribers.is_empty()
            }
            None => false,
        };

        if now_empty {
            self.remove_if_empty(conversation_id);
        }

        delivery
    }

    pub fn contains(&self, handle: &ConnectionHandle) -> bool {
        self.conversations
            .get(&handle.conversation_id)
            .is_some_and(|subscribers| subscribers.contains_key(&handle.id))
    }

    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.conversations
            .get(conversation_id)
            .map_or(0, |subscribers| subscribers.len())
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    // Checked again under the removal guard so a concurrent register that
    // repopulated the set is never dropped.
    fn remove_if_empty(&self, conversation_id: &str) {
        self.conversations
            .remove_if(conversation_id, |_, subscribers| subscribers.is_empty());
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
