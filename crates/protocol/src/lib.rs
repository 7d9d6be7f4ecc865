//! triqui-protocol – Ereignisse zwischen Web-Client und Server
//!
//! Jedes Ereignis wird als ein WebSocket-Textframe uebertragen:
//! `{"event": "<name>", "data": <payload>}`. Ereignisse ohne Payload
//! (`game-ready`, `player-disconnected`) lassen `data` weg.

pub mod events;
pub mod wire;

pub use events::{ClientEvent, HistoryRequest, JoinRequest, MoveRequest, ServerEvent};
pub use wire::{ProtokollFehler, ProtokollResult};
