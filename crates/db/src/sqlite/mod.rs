//! SQLite-Backend der Raum-Ablage

pub mod pool;
pub mod rooms;

pub use pool::SqliteDb;
