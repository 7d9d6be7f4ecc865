//! Datenbankmodelle fuer Triqui
//!
//! `RoomRecord` ist die Grenze zwischen dem kanonischen `Room` und der
//! Ablage. Die fluechtigen Verbindungen eines Raums ueberqueren diese
//! Grenze nie.

use chrono::{DateTime, Utc};
use triqui_core::{Room, RoomCode};

use crate::error::DbError;
use crate::repository::DbResult;

/// Raum-Datensatz aus der Datenbank
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    pub code: RoomCode,
    /// Vollstaendiges Raum-Dokument (Spieler, Spielstand, Historie)
    pub document: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRecord {
    /// Erstellt einen Datensatz aus einem Raum
    pub fn aus_room(raum: &Room) -> DbResult<Self> {
        Ok(Self {
            code: raum.code().clone(),
            document: serde_json::to_value(raum)?,
            created_at: raum.created_at(),
            updated_at: raum.updated_at(),
        })
    }

    /// Stellt den Raum wieder her und prueft dabei seine Invarianten
    ///
    /// Der geladene Raum hat keine aktiven Verbindungen.
    pub fn into_room(self) -> DbResult<Room> {
        let raum: Room = serde_json::from_value(self.document)?;

        if raum.code() != &self.code {
            return Err(DbError::ungueltig(format!(
                "Raumcode im Dokument ({}) passt nicht zum Schluessel ({})",
                raum.code(),
                self.code
            )));
        }
        raum.invarianten_pruefen()
            .map_err(|e| DbError::ungueltig(format!("Raum {}: {e}", self.code)))?;

        Ok(raum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triqui_core::ConnectionId;

    fn raum() -> Room {
        let x = ConnectionId::neu();
        let mut raum = Room::erstellen(RoomCode::neu("REC001"), x, "Ana");
        raum.beitreten(ConnectionId::neu(), "Beto").unwrap();
        raum.zug_ausfuehren(x, 4).unwrap();
        raum
    }

    #[test]
    fn hin_und_zurueck_ohne_verbindungen() {
        let original = raum();
        let record = RoomRecord::aus_room(&original).unwrap();
        assert_eq!(record.code.as_str(), "REC001");
        assert_eq!(record.updated_at, original.updated_at());

        let geladen = record.into_room().unwrap();
        assert!(!geladen.hat_verbindungen());
        assert_eq!(geladen.history(), original.history());
        assert_eq!(geladen.game_state(), original.game_state());
    }

    #[test]
    fn abweichender_code_wird_abgelehnt() {
        let mut record = RoomRecord::aus_room(&raum()).unwrap();
        record.code = RoomCode::neu("ANDERS");
        assert!(matches!(record.into_room(), Err(DbError::UngueltigeDaten(_))));
    }

    #[test]
    fn leere_historie_wird_abgelehnt() {
        let mut record = RoomRecord::aus_room(&raum()).unwrap();
        record.document["history"] = serde_json::json!([]);
        assert!(matches!(record.into_room(), Err(DbError::UngueltigeDaten(_))));
    }

    #[test]
    fn doppeltes_symbol_wird_abgelehnt() {
        let mut record = RoomRecord::aus_room(&raum()).unwrap();
        record.document["players"][1]["symbol"] = "X".into();
        assert!(matches!(record.into_room(), Err(DbError::UngueltigeDaten(_))));
    }

    #[test]
    fn kaputtes_dokument_ist_json_fehler() {
        let mut record = RoomRecord::aus_room(&raum()).unwrap();
        record.document = serde_json::json!({"code": "REC001"});
        assert!(matches!(record.into_room(), Err(DbError::Json(_))));
    }
}
