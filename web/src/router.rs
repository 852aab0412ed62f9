use crate::controller::{health_check_controller, message_controller};
use crate::ws::handler as ws_handler;
use crate::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use log::*;
use tower_http::cors::CorsLayer;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.allowed_origins);

    Router::new()
        .merge(health_routes())
        .merge(chat_ws_routes(app_state.clone()))
        .merge(message_routes(app_state))
        .layer(cors)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn chat_ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/ws/chat/{conversation_id}",
            get(ws_handler::chat_ws_handler),
        )
        .route("/ws/chat", get(ws_handler::missing_conversation_handler))
        .route("/ws/chat/", get(ws_handler::missing_conversation_handler))
        .with_state(app_state)
}

fn message_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/conversations/{conversation_id}/messages",
            post(message_controller::create),
        )
        .with_state(app_state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            // Credentialed CORS cannot answer with a wildcard origin
            Ok(_) if origin.trim() == "*" => {
                warn!("Ignoring wildcard CORS origin; list allowed origins explicitly");
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
