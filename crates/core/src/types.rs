//! Gemeinsame Identifikations- und Spieltypen fuer Triqui
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Verbindungs-IDs und Raumcodes zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SpielFehler;

/// Laenge eines generierten Raumcodes
pub const RAUMCODE_LAENGE: usize = 6;

/// Anzahl der Felder auf dem Brett
pub const FELDER: usize = 9;

// ---------------------------------------------------------------------------
// ConnectionId
// ---------------------------------------------------------------------------

/// Identitaet einer Client-Verbindung
///
/// Nur fuer die Lebensdauer der Verbindung stabil. Dient gleichzeitig als
/// Spieler-ID innerhalb eines Raums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Kurzer, eindeutiger Raumcode (immer in Grossbuchstaben)
///
/// Eingehende Codes werden getrimmt und in Grossbuchstaben umgewandelt,
/// damit "abc123" und "ABC123" denselben Raum bezeichnen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalisiert einen Code aus Benutzereingabe
    pub fn neu(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// Erzeugt einen zufaelligen Code mit `RAUMCODE_LAENGE` Zeichen
    pub fn generieren() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self::neu(&hex[..RAUMCODE_LAENGE])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::neu(code)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::neu(code)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Symbol / Winner
// ---------------------------------------------------------------------------

/// Spielzeichen eines Spielers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Das jeweils andere Symbol
    pub fn gegner(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

/// Ausgang einer entschiedenen Partie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Symbol> for Winner {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::X => Self::X,
            Symbol::O => Self::O,
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Gueltige Brettposition 0..=8 (zeilenweise von oben links)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Position(u8);

impl Position {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<i64> for Position {
    type Error = SpielFehler;

    fn try_from(wert: i64) -> Result<Self, Self::Error> {
        if (0..FELDER as i64).contains(&wert) {
            Ok(Self(wert as u8))
        } else {
            Err(SpielFehler::UngueltigePosition)
        }
    }
}

impl From<Position> for u8 {
    fn from(position: Position) -> Self {
        position.0
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Spielbrett mit 9 Feldern; `None` ist ein leeres Feld
///
/// Serialisiert als `[null, "X", "O", ...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([Option<Symbol>; FELDER]);

impl Board {
    /// Leeres Brett
    pub fn leer() -> Self {
        Self::default()
    }

    /// Erstellt ein Brett aus einer Feldbelegung
    pub fn aus_feldern(felder: [Option<Symbol>; FELDER]) -> Self {
        Self(felder)
    }

    pub fn feld(&self, position: Position) -> Option<Symbol> {
        self.0[position.index()]
    }

    pub fn setzen(&mut self, position: Position, symbol: Symbol) {
        self.0[position.index()] = Some(symbol);
    }

    pub fn felder(&self) -> &[Option<Symbol>; FELDER] {
        &self.0
    }

    /// Prueft ob kein Feld belegt ist
    pub fn ist_leer(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}
