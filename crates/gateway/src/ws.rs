//! WebSocket-Endpunkt `GET /socket`

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use triqui_protocol::wire::MAX_FRAME_GROESSE;

use crate::connection::ClientConnection;
use crate::server_state::GatewayState;

/// Axum-Router fuer den WebSocket-Endpunkt
pub fn socket_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/socket", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> Response {
    let Some(platz) = state.platz_reservieren() else {
        tracing::warn!(
            max = state.config.max_verbindungen,
            "Verbindung abgelehnt: Server voll"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Servidor lleno").into_response();
    };

    // Scheitert das Upgrade, wird der Platz mit der Closure freigegeben
    ws.max_message_size(MAX_FRAME_GROESSE)
        .on_upgrade(move |socket| ClientConnection::neu(state, platz).verarbeiten(socket))
}
