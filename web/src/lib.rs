//! HTTP surface of the chat relay: the websocket subscription endpoint, the
//! producer endpoint for relaying stored messages, and a health check.

use log::*;
pub use service::AppState;
use tokio::net::TcpListener;

mod controller;
mod error;
pub mod router;
mod ws;

pub use error::{Error, Result};

/// Bind the configured address and serve the relay until the process stops.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_addr = app_state.config.listen_address();
    let listener = TcpListener::bind(&listen_addr).await?;

    info!("Server starting... listening for connections on http://{listen_addr}");

    axum::serve(listener, router::define_routes(app_state)).await
}
