//! Gemeinsamer Zustand fuer das Gateway
//!
//! Haelt Registry, Broadcaster und Metriken. Clone des `Arc` teilt alles
//! zwischen den Verbindungs-Tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use triqui_observability::TriquiMetrics;

use crate::broadcast::EventBroadcaster;
use crate::registry::RoomRegistry;

/// Konfiguration fuer das Gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximale gleichzeitige WebSocket-Verbindungen
    pub max_verbindungen: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 1024,
        }
    }
}

/// Gemeinsamer Gateway-Zustand (thread-safe, Arc-geteilt)
pub struct GatewayState {
    pub config: GatewayConfig,
    pub registry: RoomRegistry,
    pub broadcaster: EventBroadcaster,
    pub metriken: Option<TriquiMetrics>,
    /// Belegte Verbindungsplaetze
    verbindungen: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
}

impl GatewayState {
    pub fn neu(
        config: GatewayConfig,
        registry: RoomRegistry,
        metriken: Option<TriquiMetrics>,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            registry,
            broadcaster: EventBroadcaster::neu(),
            metriken,
            verbindungen: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        })
    }

    /// Signalisiert allen Verbindungen, sich zu schliessen
    pub fn herunterfahren(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn shutdown_empfaenger(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Reserviert einen Verbindungsplatz, `None` wenn der Server voll ist
    ///
    /// Pruefen und Belegen ist ein einziger atomarer Schritt. Der Platz wird
    /// beim Drop des zurueckgegebenen Guards wieder frei.
    pub fn platz_reservieren(&self) -> Option<VerbindungsPlatz> {
        let max = self.config.max_verbindungen;
        self.verbindungen
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |belegt| {
                (belegt < max).then_some(belegt + 1)
            })
            .ok()
            .map(|_| VerbindungsPlatz {
                verbindungen: Arc::clone(&self.verbindungen),
            })
    }
}

/// Belegter Verbindungsplatz, lebt so lange wie die Verbindung
#[derive(Debug)]
pub struct VerbindungsPlatz {
    verbindungen: Arc<AtomicUsize>,
}

impl Drop for VerbindungsPlatz {
    fn drop(&mut self) {
        self.verbindungen.fetch_sub(1, Ordering::AcqRel);
    }
}
