//! Spielregeln – reine Funktionen ohne eigenen Zustand
//!
//! Gewinnerkennung ueber die 8 festen Linien (3 Zeilen, 3 Spalten,
//! 2 Diagonalen). Leere Felder zaehlen nie als Linie.

use crate::types::{Board, Symbol, Winner};

/// Alle Gewinnlinien als Feldindizes
pub const GEWINNLINIEN: [[usize; 3]; 8] = [
    // Zeilen
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Spalten
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonalen
    [0, 4, 8],
    [2, 4, 6],
];

/// Gibt das Symbol der ersten vollstaendigen Linie zurueck
pub fn gewinner_pruefen(brett: &Board) -> Option<Symbol> {
    let felder = brett.felder();
    GEWINNLINIEN.iter().find_map(|&[a, b, c]| match felder[a] {
        Some(symbol) if felder[b] == Some(symbol) && felder[c] == Some(symbol) => Some(symbol),
        _ => None,
    })
}

/// Prueft ob kein leeres Feld mehr vorhanden ist
pub fn ist_voll(brett: &Board) -> bool {
    brett.felder().iter().all(Option::is_some)
}

/// Ermittelt den Ausgang: Sieger, Unentschieden oder `None` (offen)
pub fn auswerten(brett: &Board) -> Option<Winner> {
    match gewinner_pruefen(brett) {
        Some(symbol) => Some(Winner::from(symbol)),
        None if ist_voll(brett) => Some(Winner::Draw),
        None => None,
    }
}
