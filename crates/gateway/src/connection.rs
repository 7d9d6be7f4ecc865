//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Eingehende Textframes gehen an den Dispatcher, die
//! Send-Queue aus dem Broadcaster wird auf den Socket geschrieben.
//!
//! ```text
//! WebSocket ──Text──► Dispatcher ──► Broadcaster ──► Send-Queue ──► WebSocket
//! ```

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use triqui_core::ConnectionId;
use triqui_protocol::{wire, ServerEvent};

use crate::dispatcher::{Dispatcher, MELDUNG_UNGUELTIG};
use crate::server_state::{GatewayState, VerbindungsPlatz};

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<GatewayState>,
    conn: ConnectionId,
    /// Wird mit der Verbindung freigegeben
    _platz: VerbindungsPlatz,
}

impl ClientConnection {
    pub fn neu(state: Arc<GatewayState>, platz: VerbindungsPlatz) -> Self {
        Self {
            state,
            conn: ConnectionId::neu(),
            _platz: platz,
        }
    }

    /// Verarbeitungsschleife bis zum Trennen oder Herunterfahren
    pub async fn verarbeiten(self, socket: WebSocket) {
        let conn = self.conn;
        let dispatcher = Dispatcher::neu(Arc::clone(&self.state));
        let mut shutdown_rx = self.state.shutdown_empfaenger();

        let (mut sender, mut empfaenger) = socket.split();
        let mut sende_rx = self.state.broadcaster.client_registrieren(conn);
        if let Some(m) = &self.state.metriken {
            m.connected_clients.inc();
        }
        tracing::info!(conn = %conn, "Neue Verbindung");

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = empfaenger.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            dispatcher.text_verarbeiten(conn, &text).await;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            self.state
                                .broadcaster
                                .an_client_senden(&conn, ServerEvent::fehler(MELDUNG_UNGUELTIG));
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(conn = %conn, "Verbindung vom Client getrennt");
                            break;
                        }
                        // Ping/Pong beantwortet axum selbst
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(conn = %conn, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus der Send-Queue
                ausgehend = sende_rx.recv() => {
                    let Some(event) = ausgehend else { break };
                    let text = match wire::kodieren(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(conn = %conn, fehler = %e, "Ereignis nicht kodierbar");
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        tracing::warn!(conn = %conn, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                _ = shutdown_rx.changed() => {
                    tracing::debug!(conn = %conn, "Server faehrt herunter, Verbindung wird geschlossen");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        dispatcher.verbindung_getrennt(conn).await;
        if let Some(m) = &self.state.metriken {
            m.connected_clients.dec();
        }
    }
}
