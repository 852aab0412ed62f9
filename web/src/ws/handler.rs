use crate::{AppState, Error};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use log::*;
use relay::bootstrap;
use relay::error::Error as RelayError;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConnectParams {
    /// Identity of the already-authenticated subscriber.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Upgrades a request to a websocket subscribed to one conversation's live
/// messages. The conversation id is validated before the upgrade is attempted.
pub(crate) async fn chat_ws_handler(
    Path(conversation_id): Path<String>,
    Query(params): Query<ConnectParams>,
    State(app_state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let conversation_id = match bootstrap::conversation_id(Some(&conversation_id)) {
        Ok(id) => id,
        Err(e) => return Error::from(e).into_response(),
    };
    let subscriber_id = bootstrap::subscriber_id(params.user_id.as_deref());

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!("Websocket upgrade for conversation {conversation_id} rejected: {rejection}");
            return rejection.into_response();
        }
    };

    debug!("Establishing websocket for {subscriber_id} on conversation {conversation_id}");

    let hub = app_state.hub.clone();
    let queue_capacity = app_state.config.outbound_queue_capacity;

    ws.max_message_size(app_state.config.max_message_size)
        .on_failed_upgrade(|e| warn!("Websocket upgrade failed: {e}"))
        .on_upgrade(move |socket| async move {
            let (connection, outbound) =
                bootstrap::open(&hub, conversation_id, subscriber_id, queue_capacity);
            connection.serve(socket, outbound).await;
        })
}

/// `GET /ws/chat` without a conversation.
pub(crate) async fn missing_conversation_handler() -> Error {
    Error::from(RelayError::missing_conversation_id())
}
