//! triqui-db – Dauerhafte Ablage fuer Raeume
//!
//! Die Ablage ist ein asynchron nachgefuehrter Spiegel der Raeume im
//! Speicher. Gelesen wird nur, wenn ein Raum nicht mehr im Speicher liegt.
//! Raeume verfallen nach `raum_ttl` ohne Aktivitaet.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use models::RoomRecord;
pub use repository::{DatabaseConfig, DbResult, RoomStore};
pub use sqlite::SqliteDb;
