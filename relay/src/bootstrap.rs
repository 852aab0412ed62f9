//! Turning an accepted subscription request into a registered connection.

use crate::client::Connection;
use crate::connection::{ConnectionHandle, ConversationId, SubscriberId};
use crate::error::Error;
use crate::hub::Hub;
use crate::message::Payload;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver};

/// Subscriber identity used when the request did not carry one.
pub const ANONYMOUS_SUBSCRIBER: &str = "anonymous";

/// Validate the conversation a subscription request targets.
pub fn conversation_id(raw: Option<&str>) -> Result<ConversationId, Error> {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(Error::missing_conversation_id()),
    }
}

pub fn subscriber_id(raw: Option<&str>) -> SubscriberId {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => ANONYMOUS_SUBSCRIBER.to_string(),
    }
}

/// Create a connection bound to `conversation_id` and register it with `hub`.
///
/// The returned queue must be handed to [`Connection::serve`] (or
/// [`Connection::run`]) to start its loops.
pub fn open(
    hub: &Arc<Hub>,
    conversation_id: ConversationId,
    subscriber_id: SubscriberId,
    queue_capacity: usize,
) -> (Arc<Connection>, Receiver<Payload>) {
    let handle = ConnectionHandle::new(conversation_id, subscriber_id);
    let (tx, rx) = mpsc::channel(queue_capacity);

    hub.register(&handle, tx);

    (Connection::new(hub.clone(), handle), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayErrorKind;

    #[test]
    fn conversation_id_is_required() {
        for raw in [None, Some(""), Some("   ")] {
            let err = conversation_id(raw).unwrap_err();
            assert_eq!(err.error_kind, RelayErrorKind::MissingConversationId);
        }
        assert_eq!(conversation_id(Some(" conv-1 ")).unwrap(), "conv-1");
    }

    #[test]
    fn subscriber_defaults_to_anonymous() {
        assert_eq!(subscriber_id(None), ANONYMOUS_SUBSCRIBER);
        assert_eq!(subscriber_id(Some("")), ANONYMOUS_SUBSCRIBER);
        assert_eq!(subscriber_id(Some("alice")), "alice");
    }

    #[test]
    fn open_registers_the_connection_with_its_conversation() {
        let hub = Arc::new(Hub::new());
        let (connection, _rx) = open(&hub, "conv-1".to_string(), "alice".to_string(), 4);

        assert!(hub.is_registered(connection.handle()));
        assert_eq!(connection.handle().conversation_id, "conv-1");
        assert_eq!(connection.handle().subscriber_id, "alice");
        assert_eq!(hub.subscriber_count("conv-1"), 1);
    }
}
