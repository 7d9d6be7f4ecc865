//! Raum – eine Spielsitzung als Zustandsmaschine
//!
//! Ein Raum haelt bis zu zwei Spieler, den aktuellen Spielstand und eine
//! nicht-leere Historie von Momentaufnahmen. Jede Operation validiert zuerst
//! vollstaendig und veraendert den Raum nur im Erfolgsfall.
//!
//! ## Zustaende
//!
//! ```text
//!   Wartend ──(2. Spieler)──► Laeuft ──(Sieg/Remis)──► Beendet
//!      ▲                        ▲                          │
//!      └──── zurueckspulen ─────┴──── neu_starten ─────────┘
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SpielFehler, SpielResult};
use crate::rules;
use crate::types::{Board, ConnectionId, Position, RoomCode, Symbol, Winner};

/// Maximale Spieleranzahl pro Raum
pub const MAX_SPIELER: usize = 2;

// ---------------------------------------------------------------------------
// Datenmodell
// ---------------------------------------------------------------------------

/// Ein Spieler im Raum
///
/// Die `id` ist die ConnectionId des beitretenden Clients. Der Eintrag bleibt
/// auch nach dem Trennen der Verbindung erhalten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    pub symbol: Symbol,
}

/// Aktueller Spielstand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    pub current_player: Symbol,
    pub winner: Option<Winner>,
    pub game_over: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            board: Board::leer(),
            current_player: Symbol::X,
            winner: None,
            game_over: false,
        }
    }
}

/// Ein ausgefuehrter Zug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub position: Position,
    pub player: Symbol,
    pub player_name: String,
}

/// Unveraenderliche Momentaufnahme nach einem Zug oder Neustart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub board: Board,
    pub current_player: Symbol,
    /// `None` fuer den Start- bzw. Neustart-Eintrag
    #[serde(rename = "move")]
    pub zug: Option<Move>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Start-Eintrag: leeres Brett, X am Zug, kein Zug
    pub fn start() -> Self {
        Self {
            board: Board::leer(),
            current_player: Symbol::X,
            zug: None,
            timestamp: Utc::now(),
        }
    }

    /// Prueft ob dies ein Start-Eintrag ist
    pub fn ist_start(&self) -> bool {
        self.zug.is_none() && self.board.ist_leer() && self.current_player == Symbol::X
    }

    /// Leitet den Spielstand aus der Momentaufnahme ab
    pub fn spielstand(&self) -> GameState {
        let winner = rules::auswerten(&self.board);
        GameState {
            board: self.board,
            current_player: self.current_player,
            winner,
            game_over: winner.is_some(),
        }
    }
}

/// Lebenszyklus-Phase eines Raums (abgeleitet, nicht gespeichert)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Nur ein Spieler anwesend
    Wartend,
    /// Zwei Spieler, Partie offen
    Laeuft,
    /// Partie entschieden
    Beendet,
}

/// Ergebnis eines erfolgreichen Beitritts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beitritt {
    pub symbol: Symbol,
    /// `true` genau dann wenn dieser Beitritt den Raum gefuellt hat
    pub bereit: bool,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// Kanonischer Raum
///
/// Wird unveraendert als JSON an Clients gesendet. Die Menge der aktiven
/// Verbindungen ist fluechtig und wird weder uebertragen noch gespeichert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    code: RoomCode,
    players: Vec<Player>,
    game_state: GameState,
    history: Vec<HistoryEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    verbindungen: BTreeSet<ConnectionId>,
}

impl Room {
    /// Erstellt einen Raum mit dem Ersteller als Spieler X
    pub fn erstellen(code: RoomCode, verbindung: ConnectionId, name: impl Into<String>) -> Self {
        let jetzt = Utc::now();
        let mut raum = Self {
            code,
            players: Vec::with_capacity(MAX_SPIELER),
            game_state: GameState::default(),
            history: vec![HistoryEntry::start()],
            created_at: jetzt,
            updated_at: jetzt,
            verbindungen: BTreeSet::new(),
        };
        raum.players.push(Player {
            id: verbindung,
            name: name.into(),
            symbol: Symbol::X,
        });
        raum.verbindungen.insert(verbindung);
        raum
    }

    // -----------------------------------------------------------------------
    // Zugriff
    // -----------------------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Aktive Verbindungen dieses Raums
    pub fn verbindungen(&self) -> impl Iterator<Item = &ConnectionId> {
        self.verbindungen.iter()
    }

    pub fn hat_verbindungen(&self) -> bool {
        !self.verbindungen.is_empty()
    }

    /// Sucht den Spieler einer Verbindung
    pub fn spieler(&self, verbindung: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == verbindung)
    }

    pub fn phase(&self) -> RoomPhase {
        if self.game_state.game_over {
            RoomPhase::Beendet
        } else if self.players.len() >= MAX_SPIELER {
            RoomPhase::Laeuft
        } else {
            RoomPhase::Wartend
        }
    }

    // -----------------------------------------------------------------------
    // Operationen
    // -----------------------------------------------------------------------

    /// Fuegt einen Spieler hinzu und vergibt das freie Symbol
    pub fn beitreten(
        &mut self,
        verbindung: ConnectionId,
        name: impl Into<String>,
    ) -> SpielResult<Beitritt> {
        if self.players.len() >= MAX_SPIELER {
            return Err(SpielFehler::RaumVoll);
        }

        let symbol = if self.players.is_empty() {
            Symbol::X
        } else {
            Symbol::O
        };
        self.players.push(Player {
            id: verbindung,
            name: name.into(),
            symbol,
        });
        self.verbindungen.insert(verbindung);
        self.beruehren();

        Ok(Beitritt {
            symbol,
            bereit: self.players.len() == MAX_SPIELER,
        })
    }

    /// Fuehrt einen Zug aus
    ///
    /// Reihenfolge der Pruefungen: Position, Partie-Ende, Zugrecht, Belegung.
    pub fn zug_ausfuehren(&mut self, verbindung: ConnectionId, position: i64) -> SpielResult<()> {
        let position = Position::try_from(position)?;

        if self.game_state.game_over {
            return Err(SpielFehler::SpielBeendet);
        }

        let spieler = match self.spieler(verbindung) {
            Some(s) if s.symbol == self.game_state.current_player => s.clone(),
            _ => return Err(SpielFehler::NichtDeinZug),
        };

        if self.game_state.board.feld(position).is_some() {
            return Err(SpielFehler::FeldBelegt);
        }

        // Ab hier keine Fehler mehr
        let stand = &mut self.game_state;
        stand.board.setzen(position, spieler.symbol);
        match rules::auswerten(&stand.board) {
            Some(winner) => {
                stand.winner = Some(winner);
                stand.game_over = true;
            }
            None => stand.current_player = stand.current_player.gegner(),
        }

        self.history.push(HistoryEntry {
            board: self.game_state.board,
            current_player: self.game_state.current_player,
            zug: Some(Move {
                position,
                player: spieler.symbol,
                player_name: spieler.name,
            }),
            timestamp: Utc::now(),
        });
        self.beruehren();
        Ok(())
    }

    /// Springt zu einem Historien-Eintrag zurueck (ohne Redo)
    pub fn zurueckspulen(&mut self, index: i64) -> SpielResult<()> {
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.history.len())
            .ok_or(SpielFehler::UngueltigerHistorienIndex)?;

        self.history.truncate(index + 1);
        let ziel = &self.history[index];
        self.game_state = GameState {
            board: ziel.board,
            current_player: ziel.current_player,
            winner: None,
            game_over: false,
        };
        self.beruehren();
        Ok(())
    }

    /// Setzt die Partie zurueck und haengt einen neuen Start-Eintrag an
    pub fn neu_starten(&mut self) {
        self.game_state = GameState::default();
        self.history.push(HistoryEntry::start());
        self.beruehren();
    }

    // -----------------------------------------------------------------------
    // Verbindungen
    // -----------------------------------------------------------------------

    /// Entfernt eine Verbindung; der Spieler-Eintrag bleibt bestehen
    ///
    /// Gibt `true` zurueck wenn die Verbindung Mitglied war.
    pub fn verbindung_trennen(&mut self, verbindung: ConnectionId) -> bool {
        self.verbindungen.remove(&verbindung)
    }

    // -----------------------------------------------------------------------
    // Invarianten
    // -----------------------------------------------------------------------

    /// Prueft die strukturellen Invarianten eines geladenen Raums
    pub fn invarianten_pruefen(&self) -> Result<(), &'static str> {
        let erster = self.history.first().ok_or("Historie ist leer")?;
        if !erster.ist_start() {
            return Err("Erster Historien-Eintrag ist kein Start-Eintrag");
        }
        if self.players.len() > MAX_SPIELER {
            return Err("Mehr als zwei Spieler");
        }
        if let [a, b] = self.players.as_slice() {
            if a.symbol == b.symbol {
                return Err("Doppelt vergebenes Symbol");
            }
        }
        if self.game_state.game_over != self.game_state.winner.is_some() {
            return Err("gameOver und winner widersprechen sich");
        }
        Ok(())
    }

    fn beruehren(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raum_mit_zwei_spielern() -> (Room, ConnectionId, ConnectionId) {
        let x = ConnectionId::neu();
        let o = ConnectionId::neu();
        let mut raum = Room::erstellen(RoomCode::neu("TEST01"), x, "Ana");
        raum.beitreten(o, "Beto").unwrap();
        (raum, x, o)
    }

    fn zuege(raum: &mut Room, x: ConnectionId, o: ConnectionId, positionen: &[i64]) {
        for (i, &pos) in positionen.iter().enumerate() {
            let wer = if i % 2 == 0 { x } else { o };
            raum.zug_ausfuehren(wer, pos).unwrap();
        }
    }

    #[test]
    fn erstellen_setzt_startzustand() {
        let conn = ConnectionId::neu();
        let raum = Room::erstellen(RoomCode::neu("abc123"), conn, "Ana");

        assert_eq!(raum.code().as_str(), "ABC123");
        assert_eq!(raum.players().len(), 1);
        assert_eq!(raum.players()[0].symbol, Symbol::X);
        assert_eq!(raum.history().len(), 1);
        assert!(raum.history()[0].ist_start());
        assert_eq!(raum.game_state(), &GameState::default());
        assert_eq!(raum.phase(), RoomPhase::Wartend);
        assert!(raum.hat_verbindungen());
        assert!(raum.invarianten_pruefen().is_ok());
    }

    #[test]
    fn beitritt_vergibt_o_und_meldet_bereit() {
        let mut raum = Room::erstellen(RoomCode::neu("R1"), ConnectionId::neu(), "Ana");
        let beitritt = raum.beitreten(ConnectionId::neu(), "Beto").unwrap();

        assert_eq!(beitritt.symbol, Symbol::O);
        assert!(beitritt.bereit);
        assert_eq!(raum.phase(), RoomPhase::Laeuft);
    }

    #[test]
    fn dritter_beitritt_wird_abgelehnt() {
        let (mut raum, _, _) = raum_mit_zwei_spielern();
        let vorher = raum.clone();

        let fehler = raum.beitreten(ConnectionId::neu(), "Carla").unwrap_err();
        assert_eq!(fehler, SpielFehler::RaumVoll);
        assert_eq!(raum, vorher);
    }

    #[test]
    fn zuege_wechseln_den_spieler_ab() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        let mut erwartet = Symbol::X;
        for (i, pos) in [0, 4, 8, 2, 6].into_iter().enumerate() {
            assert_eq!(raum.game_state().current_player, erwartet);
            let wer = if i % 2 == 0 { x } else { o };
            raum.zug_ausfuehren(wer, pos).unwrap();
            erwartet = erwartet.gegner();
        }
    }

    #[test]
    fn zug_haengt_genau_einen_eintrag_an() {
        let (mut raum, x, _) = raum_mit_zwei_spielern();
        raum.zug_ausfuehren(x, 4).unwrap();

        assert_eq!(raum.history().len(), 2);
        let eintrag = &raum.history()[1];
        let zug = eintrag.zug.as_ref().unwrap();
        assert_eq!(zug.position, Position::try_from(4).unwrap());
        assert_eq!(zug.player, Symbol::X);
        assert_eq!(zug.player_name, "Ana");
        assert_eq!(eintrag.current_player, Symbol::O);
        assert_eq!(eintrag.spielstand(), *raum.game_state());
    }

    #[test]
    fn falscher_spieler_ist_nicht_am_zug() {
        let (mut raum, _, o) = raum_mit_zwei_spielern();
        let vorher = raum.clone();

        assert_eq!(raum.zug_ausfuehren(o, 0), Err(SpielFehler::NichtDeinZug));
        assert_eq!(
            raum.zug_ausfuehren(ConnectionId::neu(), 0),
            Err(SpielFehler::NichtDeinZug)
        );
        assert_eq!(raum, vorher);
    }

    #[test]
    fn doppelter_zug_wird_abgelehnt() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        raum.zug_ausfuehren(x, 3).unwrap();

        // Derselbe Zug nochmal: X ist nicht mehr am Zug
        assert_eq!(raum.zug_ausfuehren(x, 3), Err(SpielFehler::NichtDeinZug));
        // O auf dasselbe Feld: belegt
        assert_eq!(raum.zug_ausfuehren(o, 3), Err(SpielFehler::FeldBelegt));
        assert_eq!(raum.history().len(), 2);
    }

    #[test]
    fn ungueltige_position() {
        let (mut raum, x, _) = raum_mit_zwei_spielern();
        for pos in [-1, 9, 100, i64::MAX] {
            assert_eq!(
                raum.zug_ausfuehren(x, pos),
                Err(SpielFehler::UngueltigePosition)
            );
        }
        assert_eq!(raum.history().len(), 1);
    }

    #[test]
    fn sieg_beendet_die_partie() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        zuege(&mut raum, x, o, &[0, 3, 1, 4, 2]);

        let stand = raum.game_state();
        assert_eq!(stand.winner, Some(Winner::X));
        assert!(stand.game_over);
        assert_eq!(raum.phase(), RoomPhase::Beendet);
        // Gewinner bleibt am Zug vermerkt
        assert_eq!(stand.current_player, Symbol::X);
        assert_eq!(raum.history().last().unwrap().spielstand(), *stand);

        assert_eq!(raum.zug_ausfuehren(o, 5), Err(SpielFehler::SpielBeendet));
        assert_eq!(raum.history().len(), 6);
    }

    #[test]
    fn volles_brett_ist_unentschieden() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        // X O X / X O O / O X X
        zuege(&mut raum, x, o, &[0, 1, 2, 4, 3, 5, 7, 6, 8]);

        assert_eq!(raum.game_state().winner, Some(Winner::Draw));
        assert!(raum.game_state().game_over);
        assert_eq!(raum.history().len(), 10);
    }

    #[test]
    fn zurueckspulen_kuerzt_historie() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        zuege(&mut raum, x, o, &[0, 3, 1, 4, 2]);
        assert!(raum.game_state().game_over);

        raum.zurueckspulen(2).unwrap();
        assert_eq!(raum.history().len(), 3);
        let stand = raum.game_state();
        assert!(!stand.game_over);
        assert_eq!(stand.winner, None);
        assert_eq!(stand.board, raum.history()[2].board);
        assert_eq!(stand.current_player, Symbol::X);
    }

    #[test]
    fn zurueckspulen_auf_start() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        zuege(&mut raum, x, o, &[4, 0]);

        raum.zurueckspulen(0).unwrap();
        assert_eq!(raum.history().len(), 1);
        assert!(raum.game_state().board.ist_leer());
        assert_eq!(raum.game_state().current_player, Symbol::X);
    }

    #[test]
    fn zurueckspulen_ausserhalb_der_historie() {
        let (mut raum, x, _) = raum_mit_zwei_spielern();
        raum.zug_ausfuehren(x, 0).unwrap();
        let vorher = raum.clone();

        for index in [-1, 2, 50] {
            assert_eq!(
                raum.zurueckspulen(index),
                Err(SpielFehler::UngueltigerHistorienIndex)
            );
        }
        assert_eq!(raum, vorher);
    }

    #[test]
    fn zurueckspulen_nach_sieg_erlaubt_weiterspielen() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        zuege(&mut raum, x, o, &[0, 3, 1, 4, 2]);

        // Zustand vor dem Siegzug: X am Zug
        raum.zurueckspulen(4).unwrap();
        raum.zug_ausfuehren(x, 8).unwrap();
        assert_eq!(raum.game_state().current_player, Symbol::O);
        assert_eq!(raum.history().len(), 6);
    }

    #[test]
    fn neustart_haengt_starteintrag_an() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        zuege(&mut raum, x, o, &[0, 3, 1]);

        raum.neu_starten();
        assert_eq!(raum.history().len(), 5);
        assert!(raum.history().last().unwrap().ist_start());
        assert_eq!(raum.game_state(), &GameState::default());
        assert_eq!(raum.players().len(), 2);
    }

    #[test]
    fn verbindungen_verwalten() {
        let (mut raum, x, o) = raum_mit_zwei_spielern();
        assert!(raum.verbindung_trennen(x));
        assert!(!raum.verbindung_trennen(x));
        assert!(raum.hat_verbindungen());
        assert!(raum.verbindung_trennen(o));
        assert!(!raum.hat_verbindungen());
        // Spieler bleiben erhalten
        assert_eq!(raum.players().len(), 2);
    }

    #[test]
    fn json_form_fuer_clients() {
        let (mut raum, x, _) = raum_mit_zwei_spielern();
        raum.zug_ausfuehren(x, 0).unwrap();

        let json = serde_json::to_value(&raum).unwrap();
        assert_eq!(json["code"], "TEST01");
        assert_eq!(json["players"][1]["symbol"], "O");
        assert_eq!(json["gameState"]["board"][0], "X");
        assert_eq!(json["gameState"]["currentPlayer"], "O");
        assert_eq!(json["gameState"]["winner"], serde_json::Value::Null);
        assert_eq!(json["gameState"]["gameOver"], false);
        assert_eq!(json["history"][0]["move"], serde_json::Value::Null);
        assert_eq!(json["history"][1]["move"]["playerName"], "Ana");
        assert!(json.get("verbindungen").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn geladener_raum_hat_keine_verbindungen() {
        let (raum, _, _) = raum_mit_zwei_spielern();
        let json = serde_json::to_string(&raum).unwrap();
        let geladen: Room = serde_json::from_str(&json).unwrap();

        assert!(!geladen.hat_verbindungen());
        assert_eq!(geladen.players(), raum.players());
        assert!(geladen.invarianten_pruefen().is_ok());
    }

    #[test]
    fn invarianten_erkennen_defekte_historie() {
        let (raum, _, _) = raum_mit_zwei_spielern();
        let mut json = serde_json::to_value(&raum).unwrap();
        json["history"] = serde_json::json!([]);
        let defekt: Room = serde_json::from_value(json).unwrap();
        assert!(defekt.invarianten_pruefen().is_err());
    }
}
