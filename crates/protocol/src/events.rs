//! Client- und Server-Ereignisse
//!
//! ## Design
//! - Adjazent getaggte Enums: `event` traegt den Namen, `data` die Nutzlast
//! - Feldnamen in camelCase wie im Web-Client
//! - Positionen und Indizes kommen als rohe Ganzzahlen an, die Bereichspruefung
//!   uebernimmt der Raum (damit der Client die passende Fehlermeldung bekommt)

use serde::{Deserialize, Serialize};
use triqui_core::{Room, RoomCode};

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Beitritts-Anfrage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_code: RoomCode,
    pub player_name: String,
}

/// Zug-Anfrage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub room_code: RoomCode,
    pub position: i64,
}

/// Anfrage zum Zurueckspulen der Historie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub room_code: RoomCode,
    pub history_index: i64,
}

/// Eingehende Ereignisse eines Clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Neuen Raum anlegen; Nutzlast ist der Spielername
    CreateRoom(String),
    JoinRoom(JoinRequest),
    MakeMove(MoveRequest),
    GoToHistory(HistoryRequest),
    /// Partie neu starten; Nutzlast ist der Raumcode
    RestartGame(RoomCode),
}

impl ClientEvent {
    /// Ereignisname fuer Logs und Metriken
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "create-room",
            Self::JoinRoom(_) => "join-room",
            Self::MakeMove(_) => "make-move",
            Self::GoToHistory(_) => "go-to-history",
            Self::RestartGame(_) => "restart-game",
        }
    }

    /// Raumcode auf den sich das Ereignis bezieht (nicht bei `create-room`)
    pub fn raum_code(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom(_) => None,
            Self::JoinRoom(r) => Some(&r.room_code),
            Self::MakeMove(r) => Some(&r.room_code),
            Self::GoToHistory(r) => Some(&r.room_code),
            Self::RestartGame(code) => Some(code),
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Ausgehende Ereignisse des Servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Nur an den Ersteller
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_code: RoomCode, room: Room },
    PlayerJoined { room: Room },
    /// Zweiter Spieler ist beigetreten
    GameReady,
    GameUpdated { room: Room },
    /// Fehlermeldung, nur an die ausloesende Verbindung
    Error(String),
    /// Eine Verbindung des Raums wurde getrennt
    PlayerDisconnected,
}

impl ServerEvent {
    pub fn fehler(meldung: impl Into<String>) -> Self {
        Self::Error(meldung.into())
    }

    /// Ereignisname fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room-created",
            Self::PlayerJoined { .. } => "player-joined",
            Self::GameReady => "game-ready",
            Self::GameUpdated { .. } => "game-updated",
            Self::Error(_) => "error",
            Self::PlayerDisconnected => "player-disconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triqui_core::ConnectionId;

    #[test]
    fn create_room_deserialisierung() {
        let ev: ClientEvent =
            serde_json::from_value(json!({"event": "create-room", "data": "Ana"})).unwrap();
        assert_eq!(ev, ClientEvent::CreateRoom("Ana".into()));
        assert_eq!(ev.raum_code(), None);
    }

    #[test]
    fn join_room_normalisiert_code() {
        let ev: ClientEvent = serde_json::from_value(json!({
            "event": "join-room",
            "data": {"roomCode": "ab12cd", "playerName": "Beto"}
        }))
        .unwrap();
        let ClientEvent::JoinRoom(req) = ev else {
            panic!("falscher Typ: {ev:?}");
        };
        assert_eq!(req.room_code.as_str(), "AB12CD");
        assert_eq!(req.player_name, "Beto");
    }

    #[test]
    fn make_move_akzeptiert_ungueltige_position() {
        let ev: ClientEvent = serde_json::from_value(json!({
            "event": "make-move",
            "data": {"roomCode": "X1", "position": 42}
        }))
        .unwrap();
        assert!(matches!(ev, ClientEvent::MakeMove(MoveRequest { position: 42, .. })));
    }

    #[test]
    fn go_to_history_und_restart() {
        let ev: ClientEvent = serde_json::from_value(json!({
            "event": "go-to-history",
            "data": {"roomCode": "X1", "historyIndex": 0}
        }))
        .unwrap();
        assert_eq!(ev.name(), "go-to-history");

        let ev: ClientEvent =
            serde_json::from_value(json!({"event": "restart-game", "data": "x1"})).unwrap();
        assert_eq!(ev, ClientEvent::RestartGame(RoomCode::neu("X1")));
    }

    #[test]
    fn unbekanntes_ereignis_wird_abgelehnt() {
        let ergebnis: Result<ClientEvent, _> =
            serde_json::from_value(json!({"event": "cheat", "data": 1}));
        assert!(ergebnis.is_err());
    }

    #[test]
    fn server_ereignisse_ohne_nutzlast() {
        let json = serde_json::to_value(ServerEvent::GameReady).unwrap();
        assert_eq!(json, json!({"event": "game-ready"}));
        let json = serde_json::to_value(ServerEvent::PlayerDisconnected).unwrap();
        assert_eq!(json, json!({"event": "player-disconnected"}));
    }

    #[test]
    fn room_created_form() {
        let raum = Room::erstellen(RoomCode::neu("ABC123"), ConnectionId::neu(), "Ana");
        let ev = ServerEvent::RoomCreated {
            room_code: raum.code().clone(),
            room: raum,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "room-created");
        assert_eq!(json["data"]["roomCode"], "ABC123");
        assert_eq!(json["data"]["room"]["players"][0]["name"], "Ana");
    }

    #[test]
    fn fehler_ist_reiner_text() {
        let json = serde_json::to_value(ServerEvent::fehler("No es tu turno")).unwrap();
        assert_eq!(json, json!({"event": "error", "data": "No es tu turno"}));
    }
}
