//! triqui-gateway – Raum-Registry und Session-Gateway
//!
//! ## Architektur
//!
//! ```text
//! GET /socket (WebSocket-Upgrade, ws.rs)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! Dispatcher  ── ClientEvent -> Handler -> Vec<Ausgang>
//!     |
//!     +-- room_handler (create, join, move, history, restart, disconnect)
//!
//! RoomRegistry     – Raeume im Speicher, je Raum ein Mutex, Write-Behind in die Ablage
//! EventBroadcaster – Send-Queues der Clients und Raum-Gruppen
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::{Ausgang, Dispatcher};
pub use error::{GatewayError, GatewayResult};
pub use registry::RoomRegistry;
pub use server_state::{GatewayConfig, GatewayState, VerbindungsPlatz};
pub use ws::socket_router;
