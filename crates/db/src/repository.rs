//! Repository-Trait und Datenbank-Konfiguration
//!
//! Das Repository-Pattern entkoppelt die Raum-Registry von der konkreten
//! Ablage. Der Trait ist objektsicher, damit die Registry einen
//! `Arc<dyn RoomStore>` halten und Tests eigene Ablagen einsetzen koennen.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use triqui_core::RoomCode;

use crate::error::DbError;
use crate::models::RoomRecord;

pub type DbResult<T> = std::result::Result<T, DbError>;

/// Standard-Lebensdauer eines inaktiven Raums (24 Stunden)
pub const STANDARD_RAUM_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://triqui.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
    /// Raeume ohne Aktivitaet laenger als diese Dauer gelten als abgelaufen
    pub raum_ttl: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://triqui.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
            raum_ttl: STANDARD_RAUM_TTL,
        }
    }
}

/// Dauerhafte Ablage fuer Raeume, Schluessel ist der Raumcode
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Laedt einen Raum; abgelaufene Raeume gelten als nicht vorhanden
    async fn find_by_code(&self, code: &RoomCode) -> DbResult<Option<RoomRecord>>;

    /// Legt einen Raum an oder ueberschreibt ihn
    async fn save(&self, record: &RoomRecord) -> DbResult<()>;

    /// Loescht alle Raeume deren letzte Aktivitaet vor `vor` liegt
    async fn delete_expired(&self, vor: DateTime<Utc>) -> DbResult<u64>;

    /// Anzahl gespeicherter Raeume (inklusive noch nicht geloeschter abgelaufener)
    async fn count(&self) -> DbResult<i64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_default() {
        let cfg = DatabaseConfig::default();
        assert!(cfg.sqlite_wal);
        assert_eq!(cfg.max_verbindungen, 5);
        assert_eq!(cfg.raum_ttl, Duration::from_secs(86_400));
    }
}
