//! Health-Check-Endpunkt fuer Triqui
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status "OK", Zeitstempel, Version, Uptime und dem
//! Ergebnis des letzten Datenbank-Schreibvorgangs.
//!
//! Der Status bleibt "OK" solange der Prozess antwortet. Ein Ausfall der
//! Datenbank zeigt sich nur in `db_connected`, da der Spielbetrieb aus dem
//! Speicher weiterlaeuft.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub db_connected: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub db_connected: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self::mit_db_status(Arc::new(AtomicBool::new(true)))
    }

    /// Teilt das DB-Flag mit der Stelle, die es setzt (Persistenz-Worker)
    pub fn mit_db_status(db_connected: Arc<AtomicBool>) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            db_connected,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn db_verbunden(&self) -> bool {
        self.db_connected.load(Ordering::Relaxed)
    }

    pub fn db_status_setzen(&self, verbunden: bool) {
        self.db_connected.store(verbunden, Ordering::Relaxed);
    }

    pub fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: "OK".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            db_connected: self.db_verbunden(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
