use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::controller::ApiResponse;
use crate::{AppState, Error};
use events::{DomainEvent, Message};
use log::*;
use relay::bootstrap;
use relay::error::Error as RelayError;

#[derive(Debug, Serialize)]
pub(crate) struct Accepted {
    message_id: String,
    live_subscribers: usize,
}

/// POST relay an already-stored message to the conversation's live subscribers.
///
/// Delivery is best effort: the response only reports how many connections
/// were subscribed when the message was handed to the relay.
pub async fn create(
    Path(conversation_id): Path<String>,
    State(app_state): State<AppState>,
    Json(message): Json<Message>,
) -> Result<impl IntoResponse, Error> {
    let conversation_id = bootstrap::conversation_id(Some(&conversation_id))?;
    if message.conversation_id != conversation_id {
        return Err(
            RelayError::conversation_mismatch(&conversation_id, &message.conversation_id).into(),
        );
    }

    debug!(
        "POST relay message {} ({}) to conversation {conversation_id}",
        message.id, message.sender
    );

    let live_subscribers = app_state.hub_ref().subscriber_count(&conversation_id);
    let message_id = message.id.clone();

    app_state
        .event_publisher
        .publish(DomainEvent::MessageCreated {
            conversation_id,
            message,
        })
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            Accepted {
                message_id,
                live_subscribers,
            },
        )),
    ))
}
