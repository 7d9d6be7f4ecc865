//! Event-Broadcaster – Sendet Ereignisse an Clients und Raum-Gruppen
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen Clients
//! und die Raum-Gruppen (wer hoert welchen Raum).
//!
//! ## Selektives Broadcasting
//! - An einen Client: `an_client_senden`
//! - An einen Raum: `an_raum_senden`
//! - An einen Raum ausser dem Ausloeser: `an_raum_ausser_senden`

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use triqui_core::{ConnectionId, RoomCode};
use triqui_protocol::ServerEvent;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub conn: ConnectionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Sendet ein Ereignis nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(ev)) => {
                tracing::warn!(conn = %self.conn, event = ev.name(), "Send-Queue voll – Ereignis verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(conn = %self.conn, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Client-Sender, indiziert nach ConnectionId
    clients: DashMap<ConnectionId, ClientSender>,
    /// Raum-Gruppen: room_code -> Mitglieder in Beitrittsreihenfolge
    room_members: DashMap<RoomCode, Vec<ConnectionId>>,
}

impl EventBroadcaster {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
                room_members: DashMap::new(),
            }),
        }
    }

    /// Registriert einen neuen Client und gibt seine Empfangs-Queue zurueck
    pub fn client_registrieren(&self, conn: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.clients.insert(conn, ClientSender { conn, tx });
        tracing::debug!(conn = %conn, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Client aus allen Raum-Gruppen und dem Broadcaster
    pub fn client_entfernen(&self, conn: &ConnectionId) {
        self.inner.clients.remove(conn);
        self.inner.room_members.iter_mut().for_each(|mut entry| {
            entry.value_mut().retain(|c| c != conn);
        });
        self.inner.room_members.retain(|_, members| !members.is_empty());
        tracing::debug!(conn = %conn, "Client aus Broadcaster entfernt");
    }

    /// Fuegt einen Client der Gruppe eines Raums hinzu
    ///
    /// Eine Verbindung kann mehreren Raeumen angehoeren.
    pub fn raum_beitreten(&self, conn: ConnectionId, code: &RoomCode) {
        let mut members = self.inner.room_members.entry(code.clone()).or_default();
        if !members.contains(&conn) {
            members.push(conn);
        }
    }

    /// Alle Raeume in deren Gruppe die Verbindung ist
    pub fn raeume_von(&self, conn: &ConnectionId) -> Vec<RoomCode> {
        self.inner
            .room_members
            .iter()
            .filter(|entry| entry.value().contains(conn))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Sendet ein Ereignis an einen einzelnen Client
    pub fn an_client_senden(&self, conn: &ConnectionId, event: ServerEvent) -> bool {
        match self.inner.clients.get(conn) {
            Some(sender) => sender.senden(event),
            None => {
                tracing::debug!(conn = %conn, "Senden an unbekannten Client");
                false
            }
        }
    }

    /// Sendet ein Ereignis an alle Clients eines Raums
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_raum_senden(&self, code: &RoomCode, event: ServerEvent) -> usize {
        self.an_mitglieder_senden(code, None, event)
    }

    /// Sendet ein Ereignis an alle Clients eines Raums ausser einem
    pub fn an_raum_ausser_senden(
        &self,
        code: &RoomCode,
        ausgeschlossen: &ConnectionId,
        event: ServerEvent,
    ) -> usize {
        self.an_mitglieder_senden(code, Some(ausgeschlossen), event)
    }

    fn an_mitglieder_senden(
        &self,
        code: &RoomCode,
        ausgeschlossen: Option<&ConnectionId>,
        event: ServerEvent,
    ) -> usize {
        // Mitgliederliste kopieren, damit der Shard nicht waehrend des Sendens gesperrt bleibt
        let mitglieder = self.mitglieder(code);

        mitglieder
            .iter()
            .filter(|c| Some(*c) != ausgeschlossen)
            .filter_map(|c| self.inner.clients.get(c))
            .filter(|sender| sender.senden(event.clone()))
            .count()
    }

    pub fn ist_registriert(&self, conn: &ConnectionId) -> bool {
        self.inner.clients.contains_key(conn)
    }

    /// Gibt alle Verbindungen einer Raum-Gruppe zurueck
    pub fn mitglieder(&self, code: &RoomCode) -> Vec<ConnectionId> {
        self.inner
            .room_members
            .get(code)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
