//! triqui-server – Bibliotheks-Root
//!
//! Verdrahtet Ablage, Registry, Gateway und Observability zu einem
//! HTTP-Server und stellt den Router fuer Tests bereit.

pub mod config;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use config::ServerConfig;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use triqui_db::{DbResult, RoomStore, SqliteDb};
use triqui_gateway::{socket_router, GatewayState, RoomRegistry};
use triqui_observability::{
    observability_router, request_timing_layer, timing_middleware, HealthState, TriquiMetrics,
};

/// Maximale Wartezeit auf ausstehende Schreibvorgaenge beim Herunterfahren
const SCHREIB_WARTEZEIT: Duration = Duration::from_secs(10);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen und migrieren
    /// 2. Metriken, Registry und Gateway-Zustand aufbauen
    /// 3. Aufraeum-Task fuer abgelaufene Raeume starten
    /// 4. HTTP-Server (WebSocket, Health, Metriken) starten
    /// 5. Bei Ctrl-C: Verbindungen schliessen, Schreibpuffer abarbeiten
    pub async fn starten(self) -> Result<()> {
        let config = self.config;
        tracing::info!(
            server_name = %config.server.name,
            adresse = %config.bind_adresse(),
            "Server startet"
        );

        let db = Arc::new(SqliteDb::oeffnen(&config.datenbank_config()).await?);
        let store: Arc<dyn RoomStore> = db;

        let metriken = if config.observability.metriken_aktiviert {
            Some(TriquiMetrics::neu()?)
        } else {
            None
        };

        let db_status = Arc::new(AtomicBool::new(true));
        let registry = RoomRegistry::mit_beobachtung(
            Arc::clone(&store),
            metriken.clone(),
            Arc::clone(&db_status),
        );
        let state = GatewayState::neu(config.gateway_config(), registry.clone(), metriken.clone());
        let health = HealthState::mit_db_status(db_status);

        let aufraeumer = tokio::spawn(ablauf_aufraeumer(
            store,
            config.raum_ttl(),
            config.ablauf_intervall(),
            state.shutdown_empfaenger(),
        ));

        let app = router_bauen(&config, Arc::clone(&state), health, metriken);
        let listener = tokio::net::TcpListener::bind(config.bind_adresse()).await?;
        tracing::info!(adresse = %config.bind_adresse(), "HTTP-Server gestartet (/socket, /health, /metrics)");

        let shutdown_state = Arc::clone(&state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
                }
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                shutdown_state.herunterfahren();
            })
            .await?;

        if tokio::time::timeout(SCHREIB_WARTEZEIT, registry.persistenz_abwarten())
            .await
            .is_err()
        {
            tracing::warn!("Nicht alle Raeume konnten vor dem Beenden gespeichert werden");
        }
        aufraeumer.abort();

        tracing::info!("Server beendet");
        Ok(())
    }
}

/// Baut den vollstaendigen Router: `/socket`, `/health` und `/metrics`
pub fn router_bauen(
    config: &ServerConfig,
    state: Arc<GatewayState>,
    health: HealthState,
    metriken: Option<TriquiMetrics>,
) -> Router {
    let mut app = socket_router(state).merge(observability_router(health, metriken.clone()));
    if let Some(m) = metriken {
        app = app.layer(middleware::from_fn_with_state(m, timing_middleware));
    }
    app.layer(request_timing_layer())
        .layer(cors_layer(&config.netzwerk.cors_origins))
}

/// CORS: entweder die konfigurierten Origins oder alle
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

// ---------------------------------------------------------------------------
// Ablauf abgelaufener Raeume
// ---------------------------------------------------------------------------

/// Zeitpunkt, vor dem zuletzt geaenderte Raeume als abgelaufen gelten
pub fn ablauf_grenze(jetzt: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| jetzt.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Loescht einmalig alle abgelaufenen Raeume
pub async fn abgelaufene_loeschen(store: &dyn RoomStore, ttl: Duration) -> DbResult<u64> {
    let geloescht = store.delete_expired(ablauf_grenze(Utc::now(), ttl)).await?;
    if geloescht > 0 {
        tracing::info!(anzahl = geloescht, "Abgelaufene Raeume geloescht");
    } else {
        tracing::debug!("Keine abgelaufenen Raeume");
    }
    Ok(geloescht)
}

async fn ablauf_aufraeumer(
    store: Arc<dyn RoomStore>,
    ttl: Duration,
    intervall: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut takt = tokio::time::interval(intervall);
    takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = takt.tick() => {
                if let Err(e) = abgelaufene_loeschen(store.as_ref(), ttl).await {
                    tracing::warn!(fehler = %e, "Aufraeumen abgelaufener Raeume fehlgeschlagen");
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
    tracing::debug!("Aufraeum-Task beendet");
}
