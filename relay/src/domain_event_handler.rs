use crate::Hub;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by relaying new messages to live subscribers.
///
/// Producers publish through `events::EventPublisher` once a message has been
/// stored; this handler only forwards it to the hub, it never persists or
/// transforms anything.
pub struct RelayDomainEventHandler {
    hub: Arc<Hub>,
}

impl RelayDomainEventHandler {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventHandler for RelayDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::MessageCreated {
                conversation_id,
                message,
            } => {
                debug!(
                    "Handling MessageCreated event {} for conversation {}",
                    message.id, conversation_id
                );

                self.hub.publish(conversation_id, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionHandle;
    use chrono::Utc;
    use events::{EventPublisher, Message, SenderRole};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn message_created_is_relayed_to_the_conversation() {
        let hub = Arc::new(Hub::new());
        let publisher =
            EventPublisher::new().with_handler(Arc::new(RelayDomainEventHandler::new(hub.clone())));

        let handle = ConnectionHandle::new("conv-1".to_string(), "user-1".to_string());
        let (tx, mut rx) = mpsc::channel(4);
        hub.register(&handle, tx);

        publisher
            .publish(DomainEvent::MessageCreated {
                conversation_id: "conv-1".to_string(),
                message: Message {
                    id: "m-1".to_string(),
                    conversation_id: "conv-1".to_string(),
                    sender: SenderRole::User,
                    content: "relayed".to_string(),
                    created_at: Utc::now(),
                },
            })
            .await;

        let received: Message = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(received.id, "m-1");
        assert_eq!(received.content, "relayed");
    }
}
