//! # triqui-observability
//!
//! Observability-Crate fuer Triqui:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Liveness-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware
//!
//! Beide Endpunkte laufen auf demselben Port wie der WebSocket-Endpunkt.

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, TriquiMetrics};
pub use middleware::{request_timing_layer, timing_middleware};

use axum::Router;

/// Router mit `/health` und optional `/metrics`
pub fn observability_router(health: HealthState, metriken: Option<TriquiMetrics>) -> Router {
    let router = Router::new().merge(health_router(health));
    match metriken {
        Some(m) => router.merge(metrics_router(m)),
        None => router,
    }
}
