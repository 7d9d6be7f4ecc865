//! Handler fuer alle Client-Ereignisse
//!
//! Jeder Handler fuehrt genau eine Raum-Operation aus und entscheidet anhand
//! des Ergebnisses, welche Ereignisse an wen gehen.

pub mod room_handler;
