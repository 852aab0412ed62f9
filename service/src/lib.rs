use config::Config;
use events::EventPublisher;
use log::info;
use relay::domain_event_handler::RelayDomainEventHandler;
use relay::Hub;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub hub: Arc<Hub>,
    pub event_publisher: Arc<EventPublisher>,
}

impl AppState {
    /// Builds a fresh hub and an event publisher that relays created messages
    /// through it.
    pub fn new(app_config: Config) -> Self {
        let hub = Arc::new(Hub::new());
        let event_publisher =
            EventPublisher::new().with_handler(Arc::new(RelayDomainEventHandler::new(hub.clone())));

        info!(
            "Relay ready: outbound queue capacity {}, max inbound message size {} bytes",
            app_config.outbound_queue_capacity, app_config.max_message_size
        );

        Self {
            config: app_config,
            hub,
            event_publisher: Arc::new(event_publisher),
        }
    }

    pub fn hub_ref(&self) -> &Hub {
        self.hub.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_wires_the_relay_handler_into_the_publisher() {
        let state = AppState::new(Config::default());
        assert_eq!(state.event_publisher.handler_count(), 1);
        assert_eq!(state.hub_ref().conversation_count(), 0);
    }

    #[test]
    fn cloned_state_shares_one_hub() {
        let state = AppState::new(Config::default());
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.hub, &cloned.hub));
    }
}
