//! Fehlertypen fuer die Spiellogik
//!
//! Alle Varianten sind Validierungsfehler: sie werden erkannt bevor der Raum
//! veraendert wird und gehen nur an die ausloesende Verbindung zurueck.
//! Die Meldungstexte sind die des Web-Clients und werden unveraendert
//! uebertragen.

use thiserror::Error;

/// Result-Alias fuer Raum-Operationen
pub type SpielResult<T> = std::result::Result<T, SpielFehler>;

/// Fachfehler einer Raum-Operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpielFehler {
    /// Raumcode weder im Speicher noch in der Datenbank bekannt
    #[error("Sala no encontrada")]
    RaumNichtGefunden,

    /// Raum hat bereits zwei Spieler
    #[error("La sala está llena")]
    RaumVoll,

    /// Verbindung ist kein Spieler oder nicht am Zug
    #[error("No es tu turno")]
    NichtDeinZug,

    /// Zielfeld ist bereits belegt
    #[error("Posición ocupada")]
    FeldBelegt,

    /// Position ausserhalb von 0..=8
    #[error("Posición inválida")]
    UngueltigePosition,

    /// Historien-Index ausserhalb der vorhandenen Eintraege
    #[error("Índice de historial inválido")]
    UngueltigerHistorienIndex,

    /// Partie ist entschieden, weitere Zuege werden abgelehnt
    #[error("La partida ha terminado")]
    SpielBeendet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige_entspricht_client_texten() {
        assert_eq!(SpielFehler::RaumVoll.to_string(), "La sala está llena");
        assert_eq!(SpielFehler::RaumNichtGefunden.to_string(), "Sala no encontrada");
        assert_eq!(SpielFehler::NichtDeinZug.to_string(), "No es tu turno");
        assert_eq!(SpielFehler::FeldBelegt.to_string(), "Posición ocupada");
        assert_eq!(
            SpielFehler::UngueltigerHistorienIndex.to_string(),
            "Índice de historial inválido"
        );
    }
}
