//! Live chat relay: fans out newly stored conversation messages to the
//! websocket connections currently subscribed to that conversation.
//!
//! # Architecture
//!
//! - **Hub**: owns subscriptions keyed by conversation id. Registration,
//!   removal and publishing for a conversation are serialized on that
//!   conversation's entry in a sharded map, so no caller observes a
//!   half-updated subscriber set.
//! - **Connection**: one websocket bound to one conversation for its whole
//!   lifetime. A write loop drains its bounded outbound queue and a read loop
//!   consumes inbound frames; either one stopping tears the connection down
//!   exactly once.
//! - **Ephemeral delivery**: persistence happens before a message reaches the
//!   relay. Subscribers that are offline, reconnecting, or too slow to keep up
//!   miss live messages and catch up from stored history.
//!
//! # Message Flow
//!
//! 1. Client opens `/ws/chat/{conversation_id}`; the web layer upgrades it
//! 2. A `ConnectionHandle` and bounded outbound queue are created and
//!    registered with the `Hub`
//! 3. A producer stores a message and publishes
//!    `DomainEvent::MessageCreated`
//! 4. `RelayDomainEventHandler` calls `Hub::publish`, which encodes the
//!    message once and enqueues the shared payload on every subscriber's
//!    queue without waiting
//! 5. A subscriber whose queue is full is evicted; the others still receive
//!    the message
//!
//! # Example: publishing a stored message
//!
//! ```rust,ignore
//! use events::DomainEvent;
//!
//! app_state
//!     .event_publisher
//!     .publish(DomainEvent::MessageCreated {
//!         conversation_id: message.conversation_id.clone(),
//!         message,
//!     })
//!     .await;
//! ```
//!
//! # Modules
//!
//! - `bootstrap`: validating subscription requests and registering new connections
//! - `connection`: ConnectionRegistry and connection identity types
//! - `hub`: Register/Unregister/Publish with logging
//! - `client`: per-connection read and write loops
//! - `message`: wire payloads and inbound client messages
//! - `error`: relay error kinds

pub mod bootstrap;
pub mod client;
pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod hub;
pub mod message;

pub use client::Connection;
pub use connection::{ConnectionHandle, ConnectionId, ConversationId, SubscriberId};
pub use error::{Error, RelayErrorKind};
pub use hub::Hub;
