//! triqui-core – Gemeinsame Typen, Spielregeln und Raum-Zustandsmaschine
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Triqui-Crates gemeinsam genutzt werden:
//!
//! - `types`: Newtype-IDs (Verbindung, Raumcode), Symbole, Brett, Positionen
//! - `rules`: reine Funktionen fuer Gewinn- und Unentschieden-Erkennung
//! - `room`: der Raum als Zustandsmaschine mit Historie
//! - `error`: Fachfehler, die an den ausloesenden Client zurueckgehen

pub mod error;
pub mod room;
pub mod rules;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{SpielFehler, SpielResult};
pub use room::{Beitritt, GameState, HistoryEntry, Move, Player, Room, RoomPhase};
pub use types::{Board, ConnectionId, Position, RoomCode, Symbol, Winner};
