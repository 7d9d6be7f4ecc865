//! Fehlertypen fuer das Gateway

use thiserror::Error;
use triqui_core::SpielFehler;
use triqui_db::DbError;

/// Fehlertyp fuer das Gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Fachfehler aus dem Raum (Text geht unveraendert an den Client)
    #[error(transparent)]
    Spiel(#[from] SpielFehler),

    /// Ablage nicht erreichbar oder Datensatz defekt
    #[error("Speicherfehler: {0}")]
    Speicher(#[from] DbError),

    /// Kein freier Raumcode gefunden
    #[error("Kein freier Raumcode nach {0} Versuchen")]
    CodesErschoepft(usize),
}

impl GatewayError {
    /// Text fuer das `error`-Ereignis an den Client
    ///
    /// Fachfehler behalten ihren Text, alles andere bekommt die allgemeine
    /// Meldung der jeweiligen Operation.
    pub fn client_meldung(&self, allgemein: &str) -> String {
        match self {
            Self::Spiel(e) => e.to_string(),
            _ => allgemein.to_string(),
        }
    }
}

/// Result-Typ fuer das Gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fachfehler_behalten_ihren_text() {
        let e = GatewayError::from(SpielFehler::RaumVoll);
        assert_eq!(e.client_meldung("Error uniéndose a la sala"), "La sala está llena");
    }

    #[test]
    fn speicherfehler_werden_allgemein() {
        let e = GatewayError::from(DbError::intern("Platte voll"));
        assert_eq!(
            e.client_meldung("Error uniéndose a la sala"),
            "Error uniéndose a la sala"
        );
        assert!(e.to_string().contains("Platte voll"));
    }
}
