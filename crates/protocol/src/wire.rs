//! Wire-Format fuer WebSocket-Textframes
//!
//! Ein Frame enthaelt genau ein JSON-Ereignis. Die maximale Framegroesse
//! wird vor dem Parsen geprueft.

use thiserror::Error;

use crate::events::{ClientEvent, ServerEvent};

/// Maximale Groesse eines eingehenden Textframes (16 KB)
pub const MAX_FRAME_GROESSE: usize = 16 * 1024;

pub type ProtokollResult<T> = std::result::Result<T, ProtokollFehler>;

/// Fehler beim Kodieren oder Dekodieren eines Frames
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    #[error("Frame zu gross: {0} Bytes (Maximum: {max} Bytes)", max = MAX_FRAME_GROESSE)]
    FrameZuGross(usize),

    #[error("Ungueltiges JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Dekodiert ein eingehendes Client-Ereignis
pub fn dekodieren(text: &str) -> ProtokollResult<ClientEvent> {
    if text.len() > MAX_FRAME_GROESSE {
        return Err(ProtokollFehler::FrameZuGross(text.len()));
    }
    Ok(serde_json::from_str(text)?)
}

/// Kodiert ein Server-Ereignis als Textframe
pub fn kodieren(event: &ServerEvent) -> ProtokollResult<String> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gueltiger_frame() {
        let ev = dekodieren(r#"{"event":"create-room","data":"Ana"}"#).unwrap();
        assert_eq!(ev.name(), "create-room");
    }

    #[test]
    fn kaputtes_json() {
        assert!(matches!(
            dekodieren("{\"event\":"),
            Err(ProtokollFehler::Json(_))
        ));
        assert!(matches!(dekodieren("hola"), Err(ProtokollFehler::Json(_))));
    }

    #[test]
    fn falscher_nutzlast_typ() {
        // position muss eine Ganzzahl sein
        let text = r#"{"event":"make-move","data":{"roomCode":"A","position":"cero"}}"#;
        assert!(dekodieren(text).is_err());
    }

    #[test]
    fn zu_grosser_frame() {
        let name = "a".repeat(MAX_FRAME_GROESSE);
        let text = format!(r#"{{"event":"create-room","data":"{name}"}}"#);
        assert!(matches!(
            dekodieren(&text),
            Err(ProtokollFehler::FrameZuGross(_))
        ));
    }

    #[test]
    fn kodieren_erzeugt_eine_zeile() {
        let text = kodieren(&ServerEvent::fehler("Sala no encontrada")).unwrap();
        assert_eq!(text, r#"{"event":"error","data":"Sala no encontrada"}"#);
    }
}
