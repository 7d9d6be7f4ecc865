//! Dispatcher – Routet Client-Ereignisse an die Handler
//!
//! Der Dispatcher nimmt ein dekodiertes `ClientEvent` entgegen, ruft den
//! passenden Handler auf und stellt die daraus entstandenen Ausgaenge ueber
//! den Broadcaster zu. Fehler gehen ausschliesslich an den Absender.
//! Raumereignisse aus Registry-Operationen stellen die Handler selbst zu,
//! solange der Raum noch gesperrt ist.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use triqui_core::{ConnectionId, RoomCode};
use triqui_protocol::{wire, ClientEvent, ServerEvent};

use crate::broadcast::EventBroadcaster;
use crate::handlers::room_handler;
use crate::server_state::GatewayState;

/// Antwort bei nicht dekodierbaren Frames
pub const MELDUNG_UNGUELTIG: &str = "Mensaje inválido";

/// Antwort wenn die Verarbeitung unerwartet abbricht
pub const MELDUNG_INTERN: &str = "Error interno del servidor";

/// Ein zuzustellendes Ereignis mit seinen Empfaengern
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgang {
    /// Nur an die ausloesende Verbindung
    AnAbsender(ServerEvent),
    /// An alle Verbindungen des Raums
    AnRaum(RoomCode, ServerEvent),
    /// An alle Verbindungen des Raums ausser einer
    AnRaumAusser(RoomCode, ConnectionId, ServerEvent),
}

/// Zentraler Ereignis-Dispatcher
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<GatewayState>,
}

impl Dispatcher {
    pub fn neu(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein Ereignis und gibt die noch offenen Ausgaenge zurueck
    pub async fn dispatch(&self, conn: ConnectionId, event: ClientEvent) -> Vec<Ausgang> {
        if let Some(m) = &self.state.metriken {
            m.ereignis_zaehlen(event.name());
        }
        tracing::trace!(
            conn = %conn,
            event = event.name(),
            room_code = event.raum_code().map(|c| c.as_str()),
            "Ereignis empfangen"
        );

        match event {
            ClientEvent::CreateRoom(name) => {
                room_handler::handle_create_room(conn, name, &self.state).await
            }
            ClientEvent::JoinRoom(req) => room_handler::handle_join_room(conn, req, &self.state).await,
            ClientEvent::MakeMove(req) => room_handler::handle_make_move(conn, req, &self.state).await,
            ClientEvent::GoToHistory(req) => {
                room_handler::handle_go_to_history(conn, req, &self.state).await
            }
            ClientEvent::RestartGame(code) => {
                room_handler::handle_restart_game(conn, code, &self.state).await
            }
        }
    }

    /// Verarbeitet ein Ereignis und stellt die Ausgaenge zu
    ///
    /// Ein Panic im Handler trennt weder die Verbindung noch den Prozess,
    /// der Absender bekommt eine allgemeine Fehlermeldung.
    pub async fn verarbeiten(&self, conn: ConnectionId, event: ClientEvent) {
        let name = event.name();
        let ausgaenge = match AssertUnwindSafe(self.dispatch(conn, event))
            .catch_unwind()
            .await
        {
            Ok(ausgaenge) => ausgaenge,
            Err(_) => {
                tracing::error!(conn = %conn, event = name, "Panic bei der Verarbeitung eines Ereignisses");
                vec![Ausgang::AnAbsender(ServerEvent::fehler(MELDUNG_INTERN))]
            }
        };
        self.zustellen(conn, ausgaenge);
    }

    /// Dekodiert einen Textframe und verarbeitet ihn
    pub async fn text_verarbeiten(&self, conn: ConnectionId, text: &str) {
        match wire::dekodieren(text) {
            Ok(event) => self.verarbeiten(conn, event).await,
            Err(e) => {
                tracing::debug!(conn = %conn, fehler = %e, "Ungueltiger Frame");
                self.state
                    .broadcaster
                    .an_client_senden(&conn, ServerEvent::fehler(MELDUNG_UNGUELTIG));
            }
        }
    }

    /// Raeumt nach dem Trennen einer Verbindung auf
    pub async fn verbindung_getrennt(&self, conn: ConnectionId) {
        let ausgaenge = room_handler::handle_disconnect(conn, &self.state).await;
        self.zustellen(conn, ausgaenge);
        self.state.broadcaster.client_entfernen(&conn);
        tracing::debug!(conn = %conn, "Verbindungs-Ressourcen bereinigt");
    }

    /// Stellt Ausgaenge ueber den Broadcaster zu
    pub fn zustellen(&self, absender: ConnectionId, ausgaenge: Vec<Ausgang>) {
        ausgaenge_zustellen(&self.state.broadcaster, absender, ausgaenge);
    }
}

pub(crate) fn ausgaenge_zustellen(
    broadcaster: &EventBroadcaster,
    absender: ConnectionId,
    ausgaenge: Vec<Ausgang>,
) {
    for ausgang in ausgaenge {
        match ausgang {
            Ausgang::AnAbsender(event) => {
                broadcaster.an_client_senden(&absender, event);
            }
            Ausgang::AnRaum(code, event) => {
                broadcaster.an_raum_senden(&code, event);
            }
            Ausgang::AnRaumAusser(code, ausgeschlossen, event) => {
                broadcaster.an_raum_ausser_senden(&code, &ausgeschlossen, event);
            }
        }
    }
}
