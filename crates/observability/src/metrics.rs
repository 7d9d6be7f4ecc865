//! Prometheus-kompatible Metriken fuer Triqui
//!
//! Registrierte Metriken:
//! - `triqui_connected_clients` – Gauge: Aktuell verbundene WebSocket-Clients
//! - `triqui_rooms_active` – Gauge: Raeume im Speicher
//! - `triqui_events_total` – Counter: Eingehende Ereignisse (event)
//! - `triqui_moves_total` – Counter: Angenommene Zuege
//! - `triqui_store_write_failures_total` – Counter: Fehlgeschlagene DB-Schreibvorgaenge
//! - `triqui_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `triqui_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Triqui-Prometheus-Metriken
///
/// Jede Instanz hat ihre eigene Registry, damit Tests sich nicht
/// gegenseitig beeinflussen.
#[derive(Clone)]
pub struct TriquiMetrics {
    pub registry: Arc<Registry>,

    // Spiel-Metriken
    pub connected_clients: IntGauge,
    pub rooms_active: IntGauge,
    pub events_total: IntCounterVec,
    pub moves_total: IntCounter,
    pub store_write_failures_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl TriquiMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Spiel-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "triqui_connected_clients",
            "Anzahl aktuell verbundener Clients",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let rooms_active = IntGauge::with_opts(Opts::new(
            "triqui_rooms_active",
            "Anzahl Raeume im Speicher",
        ))?;
        registry.register(Box::new(rooms_active.clone()))?;

        let events_total = IntCounterVec::new(
            Opts::new("triqui_events_total", "Eingehende Client-Ereignisse"),
            &["event"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let moves_total = IntCounter::with_opts(Opts::new(
            "triqui_moves_total",
            "Gesamtanzahl angenommener Zuege",
        ))?;
        registry.register(Box::new(moves_total.clone()))?;

        let store_write_failures_total = IntCounter::with_opts(Opts::new(
            "triqui_store_write_failures_total",
            "Fehlgeschlagene Schreibvorgaenge in die Raum-Ablage",
        ))?;
        registry.register(Box::new(store_write_failures_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("triqui_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "triqui_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            rooms_active,
            events_total,
            moves_total,
            store_write_failures_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Zaehlt ein eingehendes Ereignis
    pub fn ereignis_zaehlen(&self, event: &str) {
        self.events_total.with_label_values(&[event]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: TriquiMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<TriquiMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = TriquiMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn instanzen_sind_unabhaengig() {
        let a = TriquiMetrics::neu().unwrap();
        let b = TriquiMetrics::neu().unwrap();
        a.moves_total.inc();
        assert_eq!(a.moves_total.get(), 1);
        assert_eq!(b.moves_total.get(), 0);
    }

    #[test]
    fn ereignisse_nach_label() {
        let metriken = TriquiMetrics::neu().unwrap();
        metriken.ereignis_zaehlen("make-move");
        metriken.ereignis_zaehlen("make-move");
        metriken.ereignis_zaehlen("join-room");

        assert_eq!(
            metriken.events_total.with_label_values(&["make-move"]).get(),
            2
        );
        let text = metriken.exportieren().unwrap();
        assert!(text.contains("triqui_events_total{event=\"join-room\"} 1"));
    }

    #[tokio::test]
    async fn metrics_endpunkt_liefert_text() {
        let metriken = TriquiMetrics::neu().unwrap();
        metriken.connected_clients.set(3);
        let app = metrics_router(metriken);

        let antwort = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("triqui_connected_clients 3"));
    }
}
