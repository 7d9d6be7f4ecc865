//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage und schreibt sie in die
//! HTTP-Metriken. Das strukturierte Request-Log kommt vom `TraceLayer`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

use crate::metrics::TriquiMetrics;

/// Tracing-Layer fuer alle HTTP-Anfragen
pub fn request_timing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Axum-Middleware-Funktion: misst Antwortzeit und zaehlt Anfragen
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<TriquiMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = pfad_label(req.uri().path());
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16().to_string();

    metriken
        .http_requests_total
        .with_label_values(&[&methode, pfad, &status])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[&methode, pfad])
        .observe(dauer.as_secs_f64());

    tracing::debug!(
        method = %methode,
        path = pfad,
        status = %status,
        duration_ms = dauer.as_millis(),
        "HTTP-Anfrage abgeschlossen"
    );

    response
}

/// Begrenzt die Label-Kardinalitaet auf bekannte Pfade
pub fn pfad_label(pfad: &str) -> &'static str {
    match pfad {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/socket" => "/socket",
        _ => "other",
    }
}
